#[cfg(test)]
mod tests {
    use crate::models::{ProgressEntry, QuizAttempt, Roadmap, RoadmapProgress};
    use crate::stats::{activity_dates, compute_stats, study_streak};
    use crate::test::utils::test_utils::{phase, roadmap_content};
    use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at_noon(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
    }

    fn roadmap(id: i64, phases: Vec<crate::models::Phase>) -> Roadmap {
        let content = roadmap_content("Test Roadmap", phases);
        Roadmap {
            id,
            user_id: 1,
            title: content.title,
            goal: content.goal,
            phases: content.phases,
            general_tips: content.general_tips,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn progress(roadmap_id: i64, entries: Vec<(&str, bool)>, updated: NaiveDate) -> RoadmapProgress {
        RoadmapProgress {
            id: roadmap_id,
            user_id: 1,
            roadmap_id: roadmap_id.to_string(),
            entries: entries
                .into_iter()
                .map(|(resource_id, completed)| ProgressEntry {
                    resource_id: resource_id.to_string(),
                    completed,
                })
                .collect(),
            certificate_issued: false,
            started_at: at_noon(updated),
            completed_at: None,
            updated_at: at_noon(updated),
        }
    }

    fn attempt(score: i64, completed: NaiveDate) -> QuizAttempt {
        QuizAttempt {
            id: 1,
            user_id: 1,
            quiz_id: "quiz-1".to_string(),
            score,
            completed_at: at_noon(completed),
        }
    }

    #[test]
    fn empty_user_has_zeroed_stats() {
        let today = date(2026, 8, 26);
        let stats = compute_stats(&[], &[], &[], today);

        assert_eq!(stats.total_roadmaps, 0);
        assert_eq!(stats.active_roadmaps, 0);
        assert_eq!(stats.completed_roadmaps, 0);
        assert_eq!(stats.overall_completion, 0);
        assert_eq!(stats.average_score, 0);
        assert_eq!(stats.study_hours, 0);
        assert_eq!(stats.study_streak, 0);
    }

    #[test]
    fn item_counting_excludes_practice_questions() {
        // Phase 1: 3 skills + 1 reference, phase 2: 2 skills + 1 video = 7.
        // Both phases also carry practice questions, which never count.
        let r = roadmap(1, vec![phase("One", 3, 1, 0), phase("Two", 2, 0, 1)]);
        assert_eq!(r.total_items(), 7);
    }

    #[test]
    fn roadmap_without_progress_record_is_active() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(1, vec![phase("One", 2, 0, 0)])];

        let stats = compute_stats(&roadmaps, &[], &[], today);

        assert_eq!(stats.total_roadmaps, 1);
        assert_eq!(stats.active_roadmaps, 1);
        assert_eq!(stats.completed_roadmaps, 0);
        assert_eq!(stats.total_possible_items, 2);
    }

    #[test]
    fn empty_roadmap_is_neither_active_nor_completed() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(1, vec![])];

        let stats = compute_stats(&roadmaps, &[], &[], today);

        assert_eq!(stats.total_roadmaps, 1);
        assert_eq!(stats.active_roadmaps, 0);
        assert_eq!(stats.completed_roadmaps, 0);
        // Zero denominator must not divide.
        assert_eq!(stats.overall_completion, 0);
    }

    #[test]
    fn fully_checked_roadmap_is_completed() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(7, vec![phase("One", 3, 1, 0), phase("Two", 2, 0, 1)])];
        let entries = vec![
            ("skill-0-0", true),
            ("skill-0-1", true),
            ("skill-0-2", true),
            ("ref-0-0", true),
            ("skill-1-0", true),
            ("skill-1-1", true),
            ("vid-1-0", true),
        ];
        let progress = vec![progress(7, entries, today)];

        let stats = compute_stats(&roadmaps, &progress, &[], today);

        assert_eq!(stats.completed_roadmaps, 1);
        assert_eq!(stats.active_roadmaps, 0);
        assert_eq!(stats.completed_skills, 7);
        assert_eq!(stats.overall_completion, 100);
    }

    #[test]
    fn partially_checked_roadmap_is_active() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(3, vec![phase("One", 3, 1, 0)])];
        let progress = vec![progress(3, vec![("skill-0-0", true)], today)];

        let stats = compute_stats(&roadmaps, &progress, &[], today);

        assert_eq!(stats.active_roadmaps, 1);
        assert_eq!(stats.completed_roadmaps, 0);
        assert_eq!(stats.overall_completion, 25);
    }

    #[test]
    fn unmatched_progress_record_contributes_nothing_to_classification() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(3, vec![phase("One", 2, 0, 0)])];
        // References a roadmap id that does not exist.
        let progress = vec![progress(99, vec![("skill-0-0", true)], today)];

        let stats = compute_stats(&roadmaps, &progress, &[], today);

        assert_eq!(stats.active_roadmaps, 1); // roadmap with no matching record
        assert_eq!(stats.completed_skills, 0);
    }

    #[test]
    fn average_score_is_rounded_mean_and_zero_when_empty() {
        let today = date(2026, 8, 26);

        let stats = compute_stats(&[], &[], &[], today);
        assert_eq!(stats.average_score, 0);

        let attempts = vec![
            attempt(80, today),
            attempt(91, today),
            attempt(75, today),
        ];
        let stats = compute_stats(&[], &[], &attempts, today);
        // (80 + 91 + 75) / 3 = 82
        assert_eq!(stats.average_score, 82);
    }

    #[test]
    fn study_hours_follow_fixed_heuristic() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(1, vec![phase("One", 5, 0, 0)])];
        let progress = vec![progress(
            1,
            vec![
                ("skill-0-0", true),
                ("skill-0-1", true),
                ("skill-0-2", true),
            ],
            today,
        )];
        let attempts = vec![attempt(90, today), attempt(70, today)];

        let stats = compute_stats(&roadmaps, &progress, &attempts, today);

        // 3 * 0.5 + 2 * 0.25 = 2
        assert_eq!(stats.study_hours, 2);
    }

    #[test]
    fn compute_stats_is_idempotent() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(1, vec![phase("One", 3, 1, 0)])];
        let progress = vec![progress(1, vec![("skill-0-0", true)], today)];
        let attempts = vec![attempt(60, today)];

        let first = compute_stats(&roadmaps, &progress, &attempts, today);
        let second = compute_stats(&roadmaps, &progress, &attempts, today);

        assert_eq!(first, second);
    }

    #[test]
    fn overall_completion_stays_in_bounds() {
        let today = date(2026, 8, 26);
        let roadmaps = vec![roadmap(1, vec![phase("One", 1, 0, 0)])];
        // Stale entries can outnumber the roadmap's current items.
        let progress = vec![progress(
            1,
            vec![
                ("skill-0-0", true),
                ("stale-0-1", true),
                ("stale-0-2", true),
            ],
            today,
        )];

        let stats = compute_stats(&roadmaps, &progress, &[], today);

        assert!(stats.overall_completion >= 0);
        // Stale checkmarks inflate the numerator; the value still reports
        // what was computed rather than clamping silently.
        assert_eq!(stats.completed_skills, 3);
        assert_eq!(stats.total_possible_items, 1);
    }

    // ---- streak ----

    #[test]
    fn streak_is_zero_without_activity() {
        let today = date(2026, 8, 26);
        assert_eq!(study_streak(&[], today), 0);
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let today = date(2026, 8, 26);
        let dates = vec![
            today,
            today - Days::new(1),
            today - Days::new(2),
        ];
        assert_eq!(study_streak(&dates, today), 3);
    }

    #[test]
    fn streak_may_start_yesterday() {
        let today = date(2026, 8, 26);
        let dates = vec![today - Days::new(1), today - Days::new(2)];
        assert_eq!(study_streak(&dates, today), 2);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let today = date(2026, 8, 26);
        let dates = vec![today, today - Days::new(2), today - Days::new(3)];
        assert_eq!(study_streak(&dates, today), 1);
    }

    #[test]
    fn streak_is_zero_when_last_activity_is_stale() {
        let today = date(2026, 8, 26);
        let dates = vec![today - Days::new(2), today - Days::new(3)];
        assert_eq!(study_streak(&dates, today), 0);
    }

    #[test]
    fn streak_deduplicates_same_day_activity() {
        let today = date(2026, 8, 26);
        let dates = vec![today, today, today - Days::new(1)];
        assert_eq!(study_streak(&dates, today), 2);
    }

    #[test]
    fn activity_dates_coarse_grain_progress_records() {
        let day = date(2026, 8, 20);
        // Three completions in one record collapse to one date.
        let records = vec![progress(
            1,
            vec![("a", true), ("b", true), ("c", true), ("d", false)],
            day,
        )];
        let attempts = vec![attempt(50, date(2026, 8, 22))];

        let mut dates = activity_dates(&records, &attempts);
        dates.sort_unstable();
        dates.dedup();

        assert_eq!(dates, vec![day, date(2026, 8, 22)]);
    }

    #[test]
    fn progress_record_without_completions_contributes_no_date() {
        let day = date(2026, 8, 20);
        let records = vec![progress(1, vec![("a", false)], day)];

        assert!(activity_dates(&records, &[]).is_empty());
    }
}
