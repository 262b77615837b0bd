//! Cross-image deduplication of extracted candidates.

use std::collections::HashSet;

use crate::models::AnnouncementEvent;

use super::date_detection::DateTimeCandidate;
use super::market_session::classify;

/// Merge per-image candidates into one event list.
///
/// Candidates are visited in image order, then line order. The first
/// candidate for each `(date, time)` pair wins; later duplicates are
/// dropped. The output keeps first-occurrence order.
pub fn aggregate(per_image: &[Vec<DateTimeCandidate>]) -> Vec<AnnouncementEvent> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for candidate in per_image.iter().flatten() {
        let time24 = candidate.time24();
        let key = format!(
            "{}|{}",
            candidate.date_iso(),
            time24.as_deref().unwrap_or("")
        );
        if !seen.insert(key) {
            tracing::debug!("Skipping duplicate {} from {:?}", candidate.date_iso(), candidate.line);
            continue;
        }

        let after_close = classify(time24.as_deref());
        events.push(AnnouncementEvent {
            date: candidate.date,
            time24,
            after_close,
            original_text: candidate.line.clone(),
        });
    }

    events
}
