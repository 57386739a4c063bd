// Comment directives that exempt a line from determinism checks.
//
//     // durable-lint: deterministic
//     std::thread::sleep(backoff);          <- exempt
//
//     let id = Uuid::new_v4(); // durable-lint: deterministic   <- exempt

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct MarkerComments {
    lines: HashSet<usize>,
}

impl MarkerComments {
    /// A directive on a line of its own covers the following line; a
    /// trailing directive covers its own line. An empty directive never
    /// matches.
    pub fn parse(source: &str, directive: &str) -> Self {
        let mut lines = HashSet::new();
        let directive = directive.trim();
        if directive.is_empty() {
            return Self { lines };
        }

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            // `//` may also appear inside a string literal, so every opener
            // on the line is tried.
            let Some(pos) = comment_openers(line).find(|&pos| {
                line[pos + 2..]
                    .trim_start_matches(['/', '!', '*'])
                    .trim_start()
                    .starts_with(directive)
            }) else {
                continue;
            };
            if line[..pos].trim().is_empty() {
                lines.insert(line_no + 1);
            } else {
                lines.insert(line_no);
            }
        }

        Self { lines }
    }

    pub fn covers(&self, line: usize) -> bool {
        self.lines.contains(&line)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn comment_openers(line: &str) -> impl Iterator<Item = usize> + '_ {
    line.match_indices("//")
        .chain(line.match_indices("/*"))
        .map(|(pos, _)| pos)
}
