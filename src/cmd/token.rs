/// Characters that separate tokens on a command line.
pub const SEPARATORS: [char; 3] = [' ', ',', '\t'];

fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// Splits `line` into tokens. Runs of separators count as one.
pub fn tokens(line: &str) -> Tokens<'_> {
    Tokens { rest: line }
}

/// Iterator returned by [`tokens`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start_matches(is_separator);
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(is_separator).unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_separators() {
        let toks: Vec<&str> = tokens("writeBits 3,1\t0x0F").collect();
        assert_eq!(toks, ["writeBits", "3", "1", "0x0F"]);
    }

    #[test]
    fn collapses_runs_and_edges() {
        let toks: Vec<&str> = tokens(" ,\tnokLine ,, 1  2 ,").collect();
        assert_eq!(toks, ["nokLine", "1", "2"]);
    }

    #[test]
    fn blank_line_has_no_tokens() {
        assert_eq!(tokens("").next(), None);
        assert_eq!(tokens(" \t,, ").next(), None);
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let mut toks = tokens("a ");
        assert_eq!(toks.next(), Some("a"));
        assert_eq!(toks.next(), None);
        assert_eq!(toks.next(), None);
    }
}
