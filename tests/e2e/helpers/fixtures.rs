/// `count` sentences of 24 characters each; with a 30 character limit every
/// sentence becomes its own job
pub fn numbered_sentences(count: usize) -> String {
    (1..=count)
        .map(|n| format!("Sentence number {:02} here.", n))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Job texts produced by [`numbered_sentences`], in queue order
pub fn expected_chunks(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| format!("Sentence number {:02} here.", n))
        .collect()
}
