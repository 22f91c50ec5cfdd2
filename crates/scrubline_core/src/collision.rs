use crate::config::CollisionOrder;
use crate::types::*;

/// Push a dragged clip's candidate start off every clip it overlaps.
///
/// `others` is visited once, in the given `order`, and each push moves the
/// candidate before the next clip is tested. A clip approached from the left
/// sends the candidate to just before it; anything else sends it to just
/// after. The pass does not revisit earlier clips, so with three or more
/// clips packed closely the result can still overlap one of them; callers
/// must check before committing.
///
/// The result always lies in `[0, total_duration - duration]`.
pub fn resolve_collision<'a>(
    candidate_us: TimeUs,
    duration_us: TimeUs,
    others: impl IntoIterator<Item = &'a Clip>,
    total_duration: TimeUs,
    order: CollisionOrder,
) -> TimeUs {
    let latest_start = total_duration - duration_us;
    let mut others: Vec<&Clip> = others.into_iter().collect();
    if order == CollisionOrder::ByStart {
        others.sort_by_key(|c| c.start_us);
    }

    let mut start = candidate_us;
    for other in others {
        if !other.overlaps(start, duration_us) {
            continue;
        }
        start = if start < other.start_us {
            (other.start_us - duration_us).max(TimeUs::ZERO)
        } else {
            latest_start.min(other.end_us())
        };
    }
    start.clamp_within(TimeUs::ZERO, latest_start)
}
