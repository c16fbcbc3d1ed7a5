use once_cell::sync::OnceCell;
use regex::Regex;

use super::ThreadRequest;
use crate::config::ThreadRules;

/// Every link is shortened to t.co, so it weighs the same whatever its length.
const URL_WEIGHT: usize = 23;

/// A generated thread that breaks the output contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("segment {index} is empty")]
    EmptySegment { index: usize },
    #[error("segment {index} weighs {weight} (max {max})")]
    TooLong {
        index: usize,
        weight: usize,
        max: usize,
    },
    #[error("first segment does not contain the {0}")]
    FirstSegmentMissing(&'static str),
    #[error("last segment does not contain tag {0}")]
    LastSegmentMissingTag(String),
}

/// Post length the way X counts it: code points in the Latin and general
/// punctuation ranges weigh 1, all others (Hangul, CJK, emoji) weigh 2, and
/// each URL weighs [`URL_WEIGHT`].
pub fn weighted_len(text: &str) -> usize {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re = RE_URL.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>()\[\]{}'"]*[^\s<>()\[\]{}'".,;:!?]"#).unwrap()
    });

    let mut total = 0;
    let mut rest = 0;
    for m in re.find_iter(text) {
        total += text[rest..m.start()].chars().map(char_weight).sum::<usize>();
        total += URL_WEIGHT;
        rest = m.end();
    }
    total + text[rest..].chars().map(char_weight).sum::<usize>()
}

fn char_weight(c: char) -> usize {
    match c as u32 {
        0..=0x10FF | 0x2000..=0x200D | 0x2010..=0x201F | 0x2032..=0x2037 => 1,
        _ => 2,
    }
}

fn squash_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check a generated thread against the rules for this request.
/// Segment indexes in errors are 1-based, like the thread markers.
pub fn validate_thread(
    segments: &[String],
    req: &ThreadRequest<'_>,
    rules: &ThreadRules,
) -> Result<(), ContractViolation> {
    for (i, seg) in segments.iter().enumerate() {
        let index = i + 1;
        if seg.trim().is_empty() {
            return Err(ContractViolation::EmptySegment { index });
        }
        let weight = weighted_len(seg);
        if weight > rules.max_chars {
            return Err(ContractViolation::TooLong {
                index,
                weight,
                max: rules.max_chars,
            });
        }
    }

    // `segments` is non-empty here: empty threads never reach validation.
    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return Err(ContractViolation::EmptySegment { index: 1 });
    };

    let first_flat = squash_ws(first);
    if !first_flat.contains(req.date) {
        return Err(ContractViolation::FirstSegmentMissing("date"));
    }
    let title = squash_ws(&req.item.title);
    if !title.is_empty() && !first_flat.contains(&title) {
        return Err(ContractViolation::FirstSegmentMissing("title"));
    }
    let link = req.item.link.trim();
    if !link.is_empty() && !first.contains(link) {
        return Err(ContractViolation::FirstSegmentMissing("link"));
    }

    if let Some(tag) = rules.hashtags.iter().find(|t| !last.contains(t.as_str())) {
        return Err(ContractViolation::LastSegmentMissingTag(tag.clone()));
    }
    Ok(())
}

/// 1-based positions of segments lacking an "i/n" marker.
pub fn missing_position_markers(segments: &[String]) -> Vec<usize> {
    let n = segments.len();
    segments
        .iter()
        .enumerate()
        .filter(|(i, s)| !s.contains(&format!("{}/{}", i + 1, n)))
        .map(|(i, _)| i + 1)
        .collect()
}
