//! Identifier charset checks and slug generation.

/// Letters, digits and `.`, `-`, `_`, `+`.
pub fn is_alphanum_plus(s: &str) -> bool {
  !s.is_empty() && s.chars().all(is_plus_char)
}

/// [`is_alphanum_plus`] plus spaces; must contain at least one non-space.
pub fn is_alphanum_plus_space(s: &str) -> bool {
  !s.trim().is_empty() && s.chars().all(|c| c == ' ' || is_plus_char(c))
}

fn is_plus_char(c: char) -> bool {
  c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')
}

pub const ALPHANUM_PLUS_MESSAGE: &str = "only letters, digits, '.', '-', '_' and '+' are allowed";
pub const ALPHANUM_PLUS_SPACE_MESSAGE: &str = "only letters, digits, spaces, '.', '-', '_' and '+' are allowed";

/// Lowercases, drops everything but ASCII alphanumerics, `_`, `-` and
/// whitespace, then collapses whitespace and hyphen runs into single hyphens.
///
/// `"My Great Add-on!"` becomes `"my-great-add-on"`.
pub fn slugify(s: &str) -> String {
  let mut slug = String::with_capacity(s.len());
  let mut pending_hyphen = false;

  for c in s.trim().chars() {
    if c.is_ascii_alphanumeric() || c == '_' {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(c.to_ascii_lowercase());
    } else if c == '-' || c.is_whitespace() {
      pending_hyphen = true;
    }
  }

  slug
}

/// Workspace ids are the simple (hyphenless) form of a v4 UUID.
pub fn is_workspace_id(s: &str) -> bool {
  s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit())
}
