use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s@#:/.\-]").expect("valid regex"));
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// Compatibility-fold full-width forms (`＃`, `：`, `１２`) to their ASCII shapes.
pub fn fold_width(text: &str) -> String {
    text.nfkc().collect()
}

/// Canonical form of free text: width-folded, symbols and emoji stripped,
/// runs of spaces collapsed. Line breaks survive.
pub fn normalize_text(text: &str) -> String {
    let folded = fold_width(text);
    let stripped = DISALLOWED_RE.replace_all(&folded, "");
    let collapsed = SPACES_RE.replace_all(&stripped, " ");
    collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_full_width_before_stripping() {
        // Full-width '＃' and '：' must survive as '#' and ':'.
        assert_eq!(normalize_text("＃ＶＲＣｈａｔ　開始：２１時"), "#VRChat 開始:21時");
    }

    #[test]
    fn strips_symbols_and_emoji() {
        assert_eq!(normalize_text("集会🎉!! @host_1 【毎週】"), "集会 @host_1 毎週");
    }

    #[test]
    fn keeps_url_shape_and_line_breaks() {
        assert_eq!(
            normalize_text("see  https://x.com/a-b.c\n\tnext line "),
            "see https://x.com/a-b.c\nnext line"
        );
    }
}
