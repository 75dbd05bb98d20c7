/// Splits `line` on single spaces, skipping the empty pieces that runs of
/// spaces leave behind. Tabs are ordinary bytes. At most `max_tokens`
/// tokens are kept; the rest of the line is ignored.
pub fn tokenize(line: &[u8], max_tokens: usize) -> Vec<&[u8]> {
    line.split(|&b| b == b' ')
        .filter(|t| !t.is_empty())
        .take(max_tokens)
        .collect()
}
