//! Calendar bucketing for the day and week views.
//!
//! The business day is cut into fixed-length half-open cells `[start, end)`.
//! Anything implementing [`Scheduled`] (appointments, transport routes) is
//! placed into every cell its own interval overlaps.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// `None` unless `start < end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Midnight to midnight. On the last representable date the end saturates.
    pub fn whole_day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        Self {
            start,
            end: start
                .checked_add_signed(Duration::days(1))
                .unwrap_or(NaiveDateTime::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            opens_at: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            closes_at: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
        }
    }
}

pub trait Scheduled {
    fn id(&self) -> i32;
    fn interval(&self) -> Interval;
    /// Who is booked: the veterinarian, driver, vehicle...
    fn resource(&self) -> &str;
    fn is_active(&self) -> bool {
        true
    }
}

/// Cells of one business day. A trailing partial cell is clipped to closing time.
pub fn day_slots(date: NaiveDate, hours: &BusinessHours) -> Vec<Interval> {
    let mut slots = Vec::new();
    if hours.slot_minutes == 0 || hours.closes_at <= hours.opens_at {
        return slots;
    }

    let step = Duration::minutes(hours.slot_minutes as i64);
    let close = date.and_time(hours.closes_at);
    let mut cursor = date.and_time(hours.opens_at);
    while cursor < close {
        let end = cursor
            .checked_add_signed(step)
            .map_or(close, |next| std::cmp::min(next, close));
        slots.push(Interval { start: cursor, end });
        cursor = end;
    }
    slots
}

#[derive(Debug, Serialize)]
pub struct SlotView<'a, T> {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub items: Vec<&'a T>,
}

#[derive(Debug, Serialize)]
pub struct DayView<'a, T> {
    pub date: NaiveDate,
    pub slots: Vec<SlotView<'a, T>>,
    /// Active items on this date that fall outside business hours.
    pub outside_hours: Vec<&'a T>,
    /// Canceled / no-show items, listed but occupying no cell.
    pub inactive: Vec<&'a T>,
}

pub fn day_view<'a, T: Scheduled>(
    date: NaiveDate,
    hours: &BusinessHours,
    items: &'a [T],
) -> DayView<'a, T> {
    let day = Interval::whole_day(date);
    let mut slots: Vec<SlotView<'a, T>> = day_slots(date, hours)
        .into_iter()
        .map(|s| SlotView {
            start: s.start,
            end: s.end,
            items: Vec::new(),
        })
        .collect();
    let mut outside_hours = Vec::new();
    let mut inactive = Vec::new();

    for item in items.iter().filter(|i| i.interval().overlaps(&day)) {
        if !item.is_active() {
            inactive.push(item);
            continue;
        }
        let interval = item.interval();
        let mut placed = false;
        for slot in slots.iter_mut() {
            let cell = Interval {
                start: slot.start,
                end: slot.end,
            };
            if cell.overlaps(&interval) {
                slot.items.push(item);
                placed = true;
            }
        }
        if !placed {
            outside_hours.push(item);
        }
    }

    DayView {
        date,
        slots,
        outside_hours,
        inactive,
    }
}

pub fn week_view<'a, T: Scheduled>(
    start: NaiveDate,
    hours: &BusinessHours,
    items: &'a [T],
) -> Vec<DayView<'a, T>> {
    start
        .iter_days()
        .take(7)
        .map(|date| day_view(date, hours, items))
        .collect()
}

/// Active items booked on `resource` that overlap `candidate`.
/// `exclude_id` skips the record being rescheduled.
pub fn conflicts<'a, T: Scheduled>(
    candidate: &Interval,
    resource: &str,
    exclude_id: Option<i32>,
    existing: &'a [T],
) -> Vec<&'a T> {
    existing
        .iter()
        .filter(|e| e.is_active())
        .filter(|e| Some(e.id()) != exclude_id)
        .filter(|e| e.resource().eq_ignore_ascii_case(resource))
        .filter(|e| e.interval().overlaps(candidate))
        .collect()
}

/// Cells of the day with no active booking (for `resource`, when given).
pub fn free_slots<T: Scheduled>(
    date: NaiveDate,
    hours: &BusinessHours,
    items: &[T],
    resource: Option<&str>,
) -> Vec<Interval> {
    day_slots(date, hours)
        .into_iter()
        .filter(|slot| {
            !items.iter().any(|i| {
                i.is_active()
                    && resource.map_or(true, |r| i.resource().eq_ignore_ascii_case(r))
                    && i.interval().overlaps(slot)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Booking {
        id: i32,
        vet: &'static str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        active: bool,
    }

    impl Scheduled for Booking {
        fn id(&self) -> i32 {
            self.id
        }
        fn interval(&self) -> Interval {
            Interval {
                start: self.start,
                end: self.end,
            }
        }
        fn resource(&self) -> &str {
            self.vet
        }
        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_hms_opt(h, m, 0).unwrap()
    }

    fn booking(id: i32, vet: &'static str, start: (u32, u32), end: (u32, u32)) -> Booking {
        Booking {
            id,
            vet,
            start: at(start.0, start.1),
            end: at(end.0, end.1),
            active: true,
        }
    }

    fn hours(open: u32, close: u32) -> BusinessHours {
        BusinessHours {
            opens_at: NaiveTime::from_hms_opt(open, 0, 0).unwrap(),
            closes_at: NaiveTime::from_hms_opt(close, 0, 0).unwrap(),
            slot_minutes: 30,
        }
    }

    #[test]
    fn test_day_slots_half_hours() {
        let slots = day_slots(date(), &hours(9, 12));
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[0].start, at(9, 0));
        assert_eq!(slots[5].end, at(12, 0));
    }

    #[test]
    fn test_trailing_slot_clipped() {
        let h = BusinessHours {
            closes_at: NaiveTime::from_hms_opt(10, 15, 0).unwrap(),
            ..hours(9, 10)
        };
        let slots = day_slots(date(), &h);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].start, at(10, 0));
        assert_eq!(slots[2].end, at(10, 15));
    }

    #[test]
    fn test_inverted_hours_yield_nothing() {
        assert!(day_slots(date(), &hours(18, 8)).is_empty());
    }

    #[test]
    fn test_last_representable_date() {
        let day = Interval::whole_day(NaiveDate::MAX);
        assert_eq!(day.end, NaiveDateTime::MAX);
        assert!(day.start < day.end);
        assert_eq!(day_slots(NaiveDate::MAX, &hours(8, 18)).len(), 20);
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let a = Interval::new(at(9, 0), at(9, 30)).unwrap();
        let b = Interval::new(at(9, 30), at(10, 0)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(Interval::new(at(10, 0), at(10, 0)).is_none());
    }

    #[test]
    fn test_appointment_fills_every_overlapped_cell() {
        let items = vec![booking(1, "Dr. Lima", (9, 15), (10, 5))];
        let view = day_view(date(), &hours(9, 11), &items);
        let occupied: Vec<NaiveDateTime> = view
            .slots
            .iter()
            .filter(|s| !s.items.is_empty())
            .map(|s| s.start)
            .collect();
        assert_eq!(occupied, vec![at(9, 0), at(9, 30), at(10, 0)]);
    }

    #[test]
    fn test_end_on_boundary_leaves_next_cell_free() {
        let items = vec![booking(1, "Dr. Lima", (9, 0), (9, 30))];
        let view = day_view(date(), &hours(9, 11), &items);
        assert_eq!(view.slots[0].items.len(), 1);
        assert!(view.slots[1].items.is_empty());
    }

    #[test]
    fn test_outside_hours_and_inactive() {
        let mut canceled = booking(2, "Dr. Lima", (9, 0), (9, 30));
        canceled.active = false;
        let items = vec![booking(1, "Dr. Lima", (19, 0), (19, 30)), canceled];
        let view = day_view(date(), &hours(9, 11), &items);
        assert_eq!(view.outside_hours.len(), 1);
        assert_eq!(view.inactive.len(), 1);
        assert!(view.slots.iter().all(|s| s.items.is_empty()));
    }

    #[test]
    fn test_other_days_ignored() {
        let mut other = booking(1, "Dr. Lima", (9, 0), (9, 30));
        other.start += Duration::days(1);
        other.end += Duration::days(1);
        let items = vec![other];
        let view = day_view(date(), &hours(9, 11), &items);
        assert!(view.outside_hours.is_empty());
        assert!(view.slots.iter().all(|s| s.items.is_empty()));
    }

    #[test]
    fn test_week_view_spans_seven_days() {
        let mut later = booking(2, "Dr. Lima", (9, 0), (9, 30));
        later.start += Duration::days(3);
        later.end += Duration::days(3);
        let items = vec![booking(1, "Dr. Lima", (9, 0), (9, 30)), later];
        let week = week_view(date(), &hours(9, 10), &items);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].slots[0].items.len(), 1);
        assert_eq!(week[3].slots[0].items.len(), 1);
        assert_eq!(week[6].date, date() + Duration::days(6));
    }

    #[test]
    fn test_conflicts_same_vet_only() {
        let items = vec![
            booking(1, "Dr. Lima", (9, 0), (10, 0)),
            booking(2, "Dr. Souza", (9, 0), (10, 0)),
        ];
        let candidate = Interval::new(at(9, 30), at(10, 30)).unwrap();
        let found = conflicts(&candidate, "dr. lima", None, &items);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[test]
    fn test_conflicts_skip_inactive_and_self() {
        let mut canceled = booking(1, "Dr. Lima", (9, 0), (10, 0));
        canceled.active = false;
        let items = vec![canceled, booking(2, "Dr. Lima", (9, 0), (10, 0))];
        let candidate = Interval::new(at(9, 0), at(9, 30)).unwrap();
        assert!(conflicts(&candidate, "Dr. Lima", Some(2), &items).is_empty());
    }

    #[test]
    fn test_free_slots() {
        let items = vec![
            booking(1, "Dr. Lima", (9, 0), (9, 45)),
            booking(2, "Dr. Souza", (10, 0), (10, 30)),
        ];
        let free = free_slots(date(), &hours(9, 11), &items, Some("Dr. Lima"));
        let starts: Vec<NaiveDateTime> = free.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![at(10, 0), at(10, 30)]);

        let any = free_slots(date(), &hours(9, 11), &items, None);
        assert_eq!(any.len(), 1);
        assert_eq!(any[0].start, at(10, 30));
    }
}
