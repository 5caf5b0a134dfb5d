//! Dashboard aggregation. Everything here is pure over rows the caller
//! already fetched; completion stamping happens on the toggle path
//! (`db::reconcile_completion`), never inside these reads.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::{QuizAttempt, Roadmap, RoadmapProgress};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    #[serde(rename = "totalRoadmaps")]
    pub total_roadmaps: usize,
    #[serde(rename = "activeRoadmaps")]
    pub active_roadmaps: usize,
    #[serde(rename = "completedRoadmaps")]
    pub completed_roadmaps: usize,
    #[serde(rename = "completedSkills")]
    pub completed_skills: usize,
    #[serde(rename = "totalPossibleItems")]
    pub total_possible_items: usize,
    #[serde(rename = "overallCompletion")]
    pub overall_completion: i64,
    #[serde(rename = "averageScore")]
    pub average_score: i64,
    #[serde(rename = "studyHours")]
    pub study_hours: i64,
    #[serde(rename = "studyStreak")]
    pub study_streak: u32,
}

pub fn compute_stats(
    roadmaps: &[Roadmap],
    progress: &[RoadmapProgress],
    attempts: &[QuizAttempt],
    today: NaiveDate,
) -> DashboardStats {
    let mut active_roadmaps = 0;
    let mut completed_roadmaps = 0;
    let mut total_completed_items = 0;
    let mut total_possible_items = 0;

    for roadmap in roadmaps {
        let roadmap_total_items = roadmap.total_items();
        total_possible_items += roadmap_total_items;

        // Progress records reference roadmaps by their id rendered as a
        // string; at most one record matches.
        let record = progress
            .iter()
            .find(|rp| rp.roadmap_id == roadmap.id.to_string());

        match record {
            Some(record) => {
                let completed_items = record.completed_count();
                total_completed_items += completed_items;

                if roadmap_total_items > 0 && completed_items == roadmap_total_items {
                    completed_roadmaps += 1;
                } else if completed_items > 0 {
                    active_roadmaps += 1;
                }
            }
            // A roadmap with items but no progress yet is active by
            // virtue of existing.
            None if roadmap_total_items > 0 => active_roadmaps += 1,
            None => {}
        }
    }

    let overall_completion = if total_possible_items > 0 {
        ((total_completed_items as f64 / total_possible_items as f64) * 100.0).round() as i64
    } else {
        0
    };

    let average_score = if attempts.is_empty() {
        0
    } else {
        let sum: i64 = attempts.iter().map(|a| a.score).sum();
        (sum as f64 / attempts.len() as f64).round() as i64
    };

    // Fixed heuristic: 30 minutes per completed item, 15 per quiz. Not a
    // measured duration.
    let study_hours =
        (total_completed_items as f64 * 0.5 + attempts.len() as f64 * 0.25).round() as i64;

    let study_streak = study_streak(&activity_dates(progress, attempts), today);

    DashboardStats {
        total_roadmaps: roadmaps.len(),
        active_roadmaps,
        completed_roadmaps,
        completed_skills: total_completed_items,
        total_possible_items,
        overall_completion,
        average_score,
        study_hours,
        study_streak,
    }
}

/// Calendar dates with at least one learning activity. Each progress
/// record contributes a single date (its last update, falling back to its
/// start) no matter how many completions it holds, and only when it holds
/// at least one completed entry. Known coarse-graining: completions made
/// on different real dates within one record are not distinguished.
pub fn activity_dates(progress: &[RoadmapProgress], attempts: &[QuizAttempt]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = attempts
        .iter()
        .map(|a| a.completed_at.date_naive())
        .collect();

    for record in progress {
        if record.completed_count() > 0 {
            dates.push(record.updated_at.date_naive());
        }
    }

    dates
}

/// Consecutive days of activity ending today or yesterday. A most-recent
/// activity two or more days old breaks the streak to zero.
pub fn study_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    if dates.is_empty() {
        return 0;
    }

    let mut unique: Vec<NaiveDate> = dates.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique.reverse();

    let yesterday = today - Days::new(1);

    let mut streak = 0;
    let mut found_start = false;
    let mut check_date = today;

    for date in unique {
        if date == check_date {
            streak += 1;
            found_start = true;
            check_date = check_date - Days::new(1);
        } else if !found_start && date == yesterday {
            // No activity today; the streak may still run up to yesterday.
            streak += 1;
            found_start = true;
            check_date = date - Days::new(1);
        } else if date > check_date {
            // Future-dated noise; skip without breaking the walk.
            continue;
        } else {
            break;
        }
    }

    streak
}
