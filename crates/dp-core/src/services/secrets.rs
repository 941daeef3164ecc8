use std::collections::BTreeMap;
use std::path::Path;

const SECRETS_FILENAME: &str = ".env.local";

/// Read `<root>/.env.local` without touching the process environment.
///
/// Missing files give an empty map. Values are taken literally: `$NAME` and
/// `${NAME}` are never expanded. Lines that do not parse are skipped.
pub fn load_secrets(root: &Path) -> BTreeMap<String, String> {
    let path = root.join(SECRETS_FILENAME);
    let mut secrets = BTreeMap::new();
    if !path.is_file() {
        return secrets;
    }

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            return secrets;
        }
    };

    let literal = escape_substitutions(&contents);
    for entry in dotenvy::from_read_iter(literal.as_bytes()) {
        match entry {
            Ok((key, value)) => {
                secrets.insert(key, value);
            }
            Err(dotenvy::Error::LineParse(_, index)) => {
                // The line itself may hold a secret; only its position is logged.
                tracing::warn!(
                    "skipping unparsable line in {} (column {index})",
                    path.display()
                );
            }
            Err(e) => {
                tracing::warn!("stopped reading {}: {e}", path.display());
                break;
            }
        }
    }

    tracing::debug!(count = secrets.len(), "loaded secrets");
    secrets
}

/// Prefix every `$` that dotenvy would expand with a backslash.
///
/// Quote tracking mirrors dotenvy's: single quotes are literal already,
/// double quotes and bare values are not. Comments pass through unchanged.
fn escape_substitutions(contents: &str) -> String {
    let mut escaped = String::with_capacity(contents.len());
    let (mut strong, mut weak, mut backslash, mut comment) = (false, false, false, false);
    // Only whitespace since the last newline or blank; `#` here opens a comment.
    let mut comment_allowed = true;

    for c in contents.chars() {
        if comment {
            comment = c != '\n';
            comment_allowed = !comment;
            escaped.push(c);
            continue;
        }
        if backslash {
            backslash = false;
        } else if strong {
            strong = c != '\'';
        } else {
            match c {
                '\\' => backslash = true,
                '\'' if !weak => strong = true,
                '"' => weak = !weak,
                '$' => escaped.push('\\'),
                '#' if !weak && comment_allowed => comment = true,
                _ => {}
            }
        }
        comment_allowed = !strong && !weak && matches!(c, ' ' | '\t' | '\n');
        escaped.push(c);
    }
    escaped
}
