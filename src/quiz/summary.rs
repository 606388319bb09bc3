use std::fmt;

use teloxide::utils::html;

use crate::database::vocabulary::QuizSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performance {
    Excellent,
    Great,
    Good,
    KeepPracticing,
}

impl Performance {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Performance::Excellent
        } else if percentage >= 70.0 {
            Performance::Great
        } else if percentage >= 50.0 {
            Performance::Good
        } else {
            Performance::KeepPracticing
        }
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Performance::Excellent => "🏆 Excellent!",
            Performance::Great => "👏 Great job!",
            Performance::Good => "👍 Good work!",
            Performance::KeepPracticing => "💪 Keep practicing!",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizSummary {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub performance: Performance,
}

impl QuizSummary {
    pub fn of(session: &QuizSession) -> Self {
        let total_questions = session.total_questions();
        let percentage = if total_questions == 0 {
            0.0
        } else {
            f64::from(session.score()) / f64::from(total_questions) * 100.0
        };

        Self {
            score: session.score(),
            total_questions,
            percentage,
            performance: Performance::from_percentage(percentage),
        }
    }

    pub fn wrong(&self) -> u32 {
        self.total_questions.saturating_sub(self.score)
    }
}

impl fmt::Display for QuizSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🎯 {}\n\n{}\n📊 {}\n✅ Correct: {}\n❌ Wrong: {}\n📈 Score: {}/{} ({:.0}%)\n\n💡 Keep adding new words and take more quizzes to improve!",
            html::bold("Quiz Complete!"),
            self.performance,
            html::bold("Results:"),
            self.score,
            self.wrong(),
            self.score,
            self.total_questions,
            self.percentage
        )
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::UserId;

    use super::*;
    use crate::database::vocabulary::QuizType;

    fn session_with_score(score: u32, total: u32) -> QuizSession {
        (0..score).fold(QuizSession::new(UserId(1), QuizType::All, total), |s, _| {
            s.with_correct_answer()
        })
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(Performance::from_percentage(100.0), Performance::Excellent);
        assert_eq!(Performance::from_percentage(90.0), Performance::Excellent);
        assert_eq!(Performance::from_percentage(89.9), Performance::Great);
        assert_eq!(Performance::from_percentage(70.0), Performance::Great);
        assert_eq!(Performance::from_percentage(50.0), Performance::Good);
        assert_eq!(Performance::from_percentage(49.0), Performance::KeepPracticing);
        assert_eq!(Performance::from_percentage(0.0), Performance::KeepPracticing);
    }

    #[test]
    fn summary_reports_score_and_percentage() {
        let summary = QuizSummary::of(&session_with_score(3, 4));

        assert_eq!(summary.percentage, 75.0);
        assert_eq!(summary.performance, Performance::Great);
        assert_eq!(summary.wrong(), 1);

        let text = summary.to_string();
        assert!(text.contains("Score: 3/4 (75%)"));
        assert!(text.contains("👏 Great job!"));
    }
}
