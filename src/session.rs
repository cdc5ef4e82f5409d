use rand::RngCore;

use crate::progress::{QuizResult, ResultSink};
use crate::quiz::{Answer, Draw, QuizDomain, QuizQuestion, Scope, clear_key};

/// Final score of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub correct: usize,
    pub total: usize,
}

impl SessionOutcome {
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.correct == self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for input data, such as boundary data, before questions exist.
    Loading,
    /// Generation ran but the scoped pool had nothing to ask.
    Empty,
    InProgress,
    Complete,
}

/// Transient display state after an answer. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Idle,
    Correct,
    Wrong,
}

/// Per-domain behaviour plugged into [`QuizSession`].
pub trait QuizStrategy {
    type Question;
    type Answer;

    /// Produces a fresh question set, or `None` while the inputs are not ready.
    fn generate(&mut self, rng: &mut dyn RngCore) -> Option<Vec<Self::Question>>;

    fn matches(&self, question: &Self::Question, answer: &Self::Answer) -> bool;

    /// Called exactly once when a session completes.
    fn record(&mut self, outcome: &SessionOutcome);
}

/// Answer/feedback state machine shared by every quiz domain.
///
/// `submit_answer` is a no-op once the current question is answered, so
/// repeated taps never score twice. Progress is recorded when `next` moves
/// past the last question and at no other time.
pub struct QuizSession<S: QuizStrategy, R> {
    strategy: S,
    rng: R,
    questions: Vec<S::Question>,
    current: usize,
    selected: Option<S::Answer>,
    last_result: Option<bool>,
    correct: usize,
    phase: Phase,
    feedback: Feedback,
    feedback_ms: u32,
}

impl<S: QuizStrategy, R: RngCore> QuizSession<S, R> {
    pub fn new(strategy: S, rng: R) -> Self {
        Self {
            strategy,
            rng,
            questions: Vec::new(),
            current: 0,
            selected: None,
            last_result: None,
            correct: 0,
            phase: Phase::Loading,
            feedback: Feedback::Idle,
            feedback_ms: 600,
        }
    }

    pub fn with_feedback_ms(mut self, feedback_ms: u32) -> Self {
        self.feedback_ms = feedback_ms;
        self
    }

    /// Generates the question set and enters the first question. Stays in
    /// `Loading` while the strategy is not ready.
    pub fn start(&mut self) -> Phase {
        self.current = 0;
        self.selected = None;
        self.last_result = None;
        self.correct = 0;
        self.feedback = Feedback::Idle;

        self.phase = match self.strategy.generate(&mut self.rng) {
            None => {
                self.questions.clear();
                Phase::Loading
            }
            Some(questions) if questions.is_empty() => {
                self.questions.clear();
                Phase::Empty
            }
            Some(questions) => {
                self.questions = questions;
                Phase::InProgress
            }
        };

        log::debug!(
            "quiz session started: {:?} with {} questions",
            self.phase,
            self.questions.len()
        );
        self.phase
    }

    /// Scores `answer` against the current question. Returns `None` when
    /// there is nothing to answer or the question was already answered.
    pub fn submit_answer(&mut self, answer: S::Answer) -> Option<bool> {
        if self.phase != Phase::InProgress || self.last_result.is_some() {
            return None;
        }
        let question = self.questions.get(self.current)?;

        let is_correct = self.strategy.matches(question, &answer);
        if is_correct {
            self.correct += 1;
            self.feedback = Feedback::Correct;
        } else {
            self.feedback = Feedback::Wrong;
        }

        self.selected = Some(answer);
        self.last_result = Some(is_correct);
        Some(is_correct)
    }

    /// Advances to the next question, completing the session after the last
    /// one. An unanswered question counts as wrong.
    pub fn next(&mut self) -> Phase {
        if self.phase != Phase::InProgress {
            return self.phase;
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selected = None;
            self.last_result = None;
            self.feedback = Feedback::Idle;
            return self.phase;
        }

        self.phase = Phase::Complete;
        self.feedback = Feedback::Idle;
        let outcome = SessionOutcome {
            correct: self.correct,
            total: self.questions.len(),
        };
        log::debug!(
            "quiz session complete: {}/{}",
            outcome.correct,
            outcome.total
        );
        self.strategy.record(&outcome);
        self.phase
    }

    /// Throws the current set away and generates a new one of the same shape.
    pub fn retry(&mut self) -> Phase {
        self.start()
    }

    /// Ends the transient feedback display. Logical state is untouched.
    pub fn clear_feedback(&mut self) {
        self.feedback = Feedback::Idle;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn feedback_ms(&self) -> u32 {
        self.feedback_ms
    }

    pub fn questions(&self) -> &[S::Question] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&S::Question> {
        match self.phase {
            Phase::InProgress => self.questions.get(self.current),
            _ => None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn selected_answer(&self) -> Option<&S::Answer> {
        self.selected.as_ref()
    }

    pub fn is_answered(&self) -> bool {
        self.last_result.is_some()
    }

    /// Correctness of the answer given to the current question.
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        (self.phase == Phase::Complete).then_some(SessionOutcome {
            correct: self.correct,
            total: self.questions.len(),
        })
    }

    /// Share of the set reached so far, counting the current question.
    pub fn progress_fraction(&self) -> f64 {
        match self.phase {
            Phase::InProgress if !self.questions.is_empty() => {
                (self.current + 1) as f64 / self.questions.len() as f64
            }
            Phase::Complete => 1.0,
            _ => 0.0,
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }
}

/// Identity of one quiz configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPlan {
    pub domain: QuizDomain,
    pub scope: Scope,
    pub draw: Draw,
}

impl QuizPlan {
    pub fn new(domain: QuizDomain, scope: Scope, count: usize) -> Self {
        Self {
            domain,
            scope,
            draw: Draw::new(count),
        }
    }

    pub fn with_distractors(mut self, distractors: usize) -> Self {
        self.draw = self.draw.with_distractors(distractors);
        self
    }

    pub fn clear_key(&self) -> String {
        clear_key(self.domain, &self.scope, self.draw.count)
    }
}

/// Strategy over [`QuizQuestion`]s built by a generator closure and
/// recorded into a [`ResultSink`].
pub struct GeoQuiz<G, K> {
    plan: QuizPlan,
    generator: G,
    sink: K,
    record_clears: bool,
}

impl<G, K> GeoQuiz<G, K>
where
    G: FnMut(&mut dyn RngCore, &QuizPlan) -> Option<Vec<QuizQuestion>>,
    K: ResultSink,
{
    pub fn new(plan: QuizPlan, generator: G, sink: K) -> Self {
        Self {
            plan,
            generator,
            sink,
            record_clears: true,
        }
    }

    /// Stops perfect runs from recording a clear for this configuration.
    pub fn without_clears(mut self) -> Self {
        self.record_clears = false;
        self
    }

    pub fn plan(&self) -> &QuizPlan {
        &self.plan
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }
}

impl<G, K> QuizStrategy for GeoQuiz<G, K>
where
    G: FnMut(&mut dyn RngCore, &QuizPlan) -> Option<Vec<QuizQuestion>>,
    K: ResultSink,
{
    type Question = QuizQuestion;
    type Answer = Answer;

    fn generate(&mut self, rng: &mut dyn RngCore) -> Option<Vec<QuizQuestion>> {
        (self.generator)(rng, &self.plan)
    }

    fn matches(&self, question: &QuizQuestion, answer: &Answer) -> bool {
        question.is_correct(answer)
    }

    fn record(&mut self, outcome: &SessionOutcome) {
        let clear_key = (self.record_clears && outcome.is_perfect()).then(|| self.plan.clear_key());

        self.sink.record(&QuizResult {
            domain: self.plan.domain,
            correct: outcome.correct as u32,
            total: outcome.total as u32,
            scope_key: self.plan.scope.progress_key().map(str::to_string),
            clear_key,
        });
    }
}
