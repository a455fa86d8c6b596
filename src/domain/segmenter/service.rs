use super::error::SegmentError;
use regex::Regex;
use std::sync::LazyLock;

/// Delimiters tried, in priority order, when a sentence has to be hard split
const HARD_SPLIT_DELIMITERS: [char; 6] = [',', '!', '?', ':', ';', ' '];

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("blank line pattern is valid"));
static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("horizontal space pattern is valid"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("sentence end pattern is valid"));

/// Splits prose into chunks no longer than `max_chars` characters.
///
/// Lengths are counted in chars, not bytes. A segmenter is a plain value:
/// segmenting is pure and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegmenter {
    max_chars: usize,
    min_chars_to_merge: usize,
}

/// Segment `text` with a one-off segmenter
pub fn segment(
    text: &str,
    max_chars: usize,
    min_chars_to_merge: usize,
) -> Result<Vec<String>, SegmentError> {
    Ok(TextSegmenter::new(max_chars, min_chars_to_merge)?.segment(text))
}

impl TextSegmenter {
    pub fn new(max_chars: usize, min_chars_to_merge: usize) -> Result<Self, SegmentError> {
        if max_chars == 0 {
            return Err(SegmentError::InvalidMaxChars);
        }

        Ok(Self {
            max_chars,
            min_chars_to_merge,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn min_chars_to_merge(&self) -> usize {
        self.min_chars_to_merge
    }

    /// Turn arbitrary text into an ordered list of non-empty chunks
    pub fn segment(&self, text: &str) -> Vec<String> {
        let cleaned = clean_text(text);

        let sentences: Vec<String> = cleaned
            .split('\n')
            .filter(|paragraph| !paragraph.is_empty())
            .flat_map(split_sentences)
            .collect();

        let mut chunks = self.pack(sentences);

        if chunks.is_empty() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            return vec![trimmed.to_string()];
        }

        self.merge_short_tail(&mut chunks);

        chunks.retain(|chunk| !chunk.is_empty());
        chunks
    }

    /// Greedily pack sentences into chunks joined by a single space
    fn pack(&self, sentences: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            let sentence_len = char_len(&sentence);

            if sentence_len > self.max_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                chunks.extend(self.split_long_sentence(&sentence));
                continue;
            }

            if char_len(&current) + sentence_len + 1 > self.max_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                current = sentence;
            } else if current.is_empty() {
                current = sentence;
            } else {
                current.push(' ');
                current.push_str(&sentence);
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Cut an over-long sentence into pieces that each fit `max_chars`
    fn split_long_sentence(&self, sentence: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut rest: Vec<char> = sentence.chars().collect();

        while rest.len() > self.max_chars {
            let cut = self.find_cut(&rest);

            let piece: String = rest[..cut].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }

            let remainder: String = rest[cut..].iter().collect();
            rest = remainder.trim().chars().collect();
        }

        if !rest.is_empty() {
            pieces.push(rest.into_iter().collect());
        }

        pieces
    }

    /// Position right after the best delimiter, or `max_chars` when none is found.
    ///
    /// `chars` is always longer than `max_chars`. A kept delimiter may sit at most
    /// at index `max_chars - 1`; a space may sit at `max_chars` since trimming drops it.
    fn find_cut(&self, chars: &[char]) -> usize {
        for delimiter in HARD_SPLIT_DELIMITERS {
            let limit = if delimiter == ' ' {
                self.max_chars
            } else {
                self.max_chars - 1
            };

            if let Some(position) = chars[..=limit].iter().rposition(|c| *c == delimiter) {
                return position + 1;
            }
        }

        self.max_chars
    }

    /// Fold a too-short last chunk into its neighbour when that stays within bounds
    fn merge_short_tail(&self, chunks: &mut Vec<String>) {
        if chunks.len() < 2 {
            return;
        }

        let last_len = chunks.last().map(|chunk| char_len(chunk)).unwrap_or(0);
        if last_len >= self.min_chars_to_merge {
            return;
        }

        let Some(last) = chunks.pop() else {
            return;
        };
        let Some(previous) = chunks.last_mut() else {
            chunks.push(last);
            return;
        };

        if char_len(previous) + last_len + 1 <= self.max_chars {
            previous.push(' ');
            previous.push_str(&last);
            return;
        }

        let mut sentences = split_on_sentence_end(previous);
        if sentences.len() > 1 {
            if let Some(moved) = sentences.pop() {
                let new_last = format!("{} {}", moved, last);
                if char_len(&new_last) <= self.max_chars {
                    *previous = sentences.join(" ");
                    chunks.push(new_last);
                    return;
                }
            }
        }

        chunks.push(last);
    }
}

/// Normalize line endings, drop control characters and squeeze whitespace
fn clean_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = BLANK_LINES.replace_all(&unified, "\n");

    let printable: String = collapsed
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .collect();

    printable
        .split('\n')
        .map(|line| HORIZONTAL_SPACE.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}'..='\u{1F}' | '\u{7F}')
}

/// Split a paragraph on periods, keeping the period on every sentence
/// except a trailing fragment the paragraph did not end with one.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences: Vec<String> = paragraph
        .split('.')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| format!("{}.", fragment))
        .collect();

    if !paragraph.ends_with('.') {
        if let Some(last) = sentences.last_mut() {
            last.pop();
        }
    }

    sentences
}

/// Split after sentence-ending punctuation that is followed by whitespace
fn split_on_sentence_end(chunk: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(chunk) {
        // the punctuation mark is a single byte and stays with its sentence
        sentences.push(chunk[start..boundary.start() + 1].to_string());
        start = boundary.end();
    }
    sentences.push(chunk[start..].to_string());

    sentences
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
