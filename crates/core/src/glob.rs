//! Wildcard name matching for overrides.
//!
//! `*` matches any run of characters (including none), `?` matches exactly
//! one. Everything else matches itself; matching is case-sensitive.

/// True if `name` contains a wildcard character.
pub fn is_pattern(name: &str) -> bool {
    name.contains(['*', '?'])
}

/// Match `text` against `pattern` in full.
pub fn matches(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    // Most recent `*` in the pattern and the text position it was tried at.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                // Let the last `*` swallow one more character and retry.
                Some((sp, st)) => {
                    pi = sp + 1;
                    ti = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
