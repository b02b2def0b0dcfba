// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picks the credential configuration an activation hands out.
//!
//! Dates are zero-padded `YYYY-MM-DD` strings, so lexicographic order is
//! chronological order and windows are compared as strings. An empty start
//! date means 1970-01-01; an empty end date means open-ended. Both ends are
//! inclusive.
//!
//! Ranking keeps a running best while scanning: a candidate replaces it when
//! its start date is strictly later, or when start dates are equal and the
//! candidate is active while the best is not. A later start therefore beats
//! the active flag.

use licensor_core::CredentialConfig;
use licensor_core::time::EPOCH_DATE;

/// What the resolver needs to know about a configuration.
pub trait Windowed {
    fn start_date(&self) -> &str;
    fn end_date(&self) -> &str;
    fn is_active(&self) -> bool;
    fn group_id(&self) -> &str;
}

impl Windowed for CredentialConfig {
    fn start_date(&self) -> &str {
        &self.start_date
    }

    fn end_date(&self) -> &str {
        &self.end_date
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }
}

fn effective_start(start: &str) -> &str {
    if start.is_empty() { EPOCH_DATE } else { start }
}

/// Whether `[start, end]` contains `today`.
pub fn is_valid_on(start: &str, end: &str, today: &str) -> bool {
    if today < effective_start(start) {
        return false;
    }
    end.is_empty() || today <= end
}

/// Best configuration for `group` on `today`, or `None`.
///
/// An empty `group` lets every configuration compete.
pub fn resolve<'a, C: Windowed>(group: &str, configs: &'a [C], today: &str) -> Option<&'a C> {
    let mut best: Option<&C> = None;
    for candidate in configs {
        if !group.is_empty() && candidate.group_id() != group {
            continue;
        }
        if !is_valid_on(candidate.start_date(), candidate.end_date(), today) {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let start = effective_start(candidate.start_date());
                let current_start = effective_start(current.start_date());
                if start > current_start
                    || (start == current_start && candidate.is_active() && !current.is_active())
                {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Cfg {
        id: usize,
        start: String,
        end: String,
        active: bool,
        group: String,
    }

    impl Windowed for Cfg {
        fn start_date(&self) -> &str {
            &self.start
        }
        fn end_date(&self) -> &str {
            &self.end
        }
        fn is_active(&self) -> bool {
            self.active
        }
        fn group_id(&self) -> &str {
            &self.group
        }
    }

    fn cfg(id: usize, start: &str, end: &str, active: bool, group: &str) -> Cfg {
        Cfg {
            id,
            start: start.into(),
            end: end.into(),
            active,
            group: group.into(),
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(is_valid_on("2024-01-01", "2024-01-31", "2024-01-01"));
        assert!(is_valid_on("2024-01-01", "2024-01-31", "2024-01-31"));
        assert!(!is_valid_on("2024-01-01", "2024-01-31", "2024-02-01"));
        assert!(!is_valid_on("2024-01-02", "", "2024-01-01"));
        assert!(is_valid_on("", "", "1970-01-01"));
        assert!(is_valid_on("", "2024-01-01", "2023-12-31"));
    }

    #[test]
    fn later_start_beats_active_flag() {
        let configs = vec![
            cfg(1, "2024-01-01", "", true, "g"),
            cfg(2, "2024-06-01", "", false, "g"),
        ];
        assert_eq!(resolve("g", &configs, "2024-06-01").map(|c| c.id), Some(2));
        assert_eq!(resolve("g", &configs, "2024-05-31").map(|c| c.id), Some(1));
    }

    #[test]
    fn later_start_wins_when_both_inactive() {
        let configs = vec![
            cfg(1, "2024-01-01", "", false, "g"),
            cfg(2, "2024-06-01", "", false, "g"),
        ];
        assert_eq!(resolve("g", &configs, "2024-06-01").map(|c| c.id), Some(2));
        assert_eq!(resolve("g", &configs, "2025-01-01").map(|c| c.id), Some(2));
    }

    #[test]
    fn active_breaks_start_date_ties() {
        let configs = vec![
            cfg(1, "2024-01-01", "", false, ""),
            cfg(2, "2024-01-01", "", true, ""),
            cfg(3, "2024-01-01", "", false, ""),
        ];
        assert_eq!(resolve("", &configs, "2024-03-01").map(|c| c.id), Some(2));
    }

    #[test]
    fn empty_start_ties_with_epoch() {
        let configs = vec![
            cfg(1, "", "", false, ""),
            cfg(2, "1970-01-01", "", true, ""),
        ];
        assert_eq!(resolve("", &configs, "2024-03-01").map(|c| c.id), Some(2));
    }

    #[test]
    fn group_scopes_candidates() {
        let configs = vec![
            cfg(1, "2025-01-01", "", true, "other"),
            cfg(2, "2024-01-01", "", false, "mine"),
        ];
        assert_eq!(resolve("mine", &configs, "2025-02-01").map(|c| c.id), Some(2));
        assert_eq!(resolve("", &configs, "2025-02-01").map(|c| c.id), Some(1));
        assert!(resolve("missing", &configs, "2025-02-01").is_none());
    }

    #[test]
    fn expired_configs_are_skipped() {
        let configs = vec![cfg(1, "2024-01-01", "2024-01-31", true, "")];
        assert!(resolve("", &configs, "2024-02-01").is_none());
    }

    fn date() -> impl Strategy<Value = String> {
        prop_oneof![
            1 => Just(String::new()),
            8 => (2020u32..2027, 1u32..13, 1u32..29)
                .prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}")),
        ]
    }

    fn config_list() -> impl Strategy<Value = Vec<Cfg>> {
        prop::collection::vec(
            (date(), date(), any::<bool>(), prop_oneof![Just(""), Just("a"), Just("b")]),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(id, (start, end, active, group))| cfg(id, &start, &end, active, group))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn winner_is_eligible_and_maximal(
            configs in config_list(),
            today in date().prop_filter("non-empty", |d| !d.is_empty()),
            group in prop_oneof![Just(""), Just("a"), Just("b")],
        ) {
            let eligible: Vec<&Cfg> = configs
                .iter()
                .filter(|c| group.is_empty() || c.group == group)
                .filter(|c| is_valid_on(&c.start, &c.end, &today))
                .collect();

            match resolve(group, &configs, &today) {
                None => prop_assert!(eligible.is_empty()),
                Some(best) => {
                    prop_assert!(eligible.iter().any(|c| c.id == best.id));
                    let best_start = effective_start(&best.start);
                    for c in &eligible {
                        let start = effective_start(&c.start);
                        prop_assert!(start <= best_start);
                        if start == best_start && c.active {
                            prop_assert!(best.active);
                        }
                    }
                }
            }
        }
    }
}
