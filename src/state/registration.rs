use crate::config::GameConfig;
use crate::error::{AppResult, DomainError};
use crate::models::character::{CharacterDraft, validate_desc, validate_name};
use crate::models::types::MemberId;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The question a registering member has to answer next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStep {
    Name,
    Race,
    Sex,
    Description,
}

#[derive(Debug, Clone)]
pub struct RegistrationSession {
    pub member_id: MemberId,
    pub step: RegistrationStep,
    pub name: Option<String>,
    pub race: Option<String>,
    pub sex: Option<String>,
    pub started_at: Instant,
}

/// Outcome of answering a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Next(RegistrationStep),
    Complete(CharacterDraft),
}

impl RegistrationSession {
    fn new(member_id: MemberId) -> Self {
        Self {
            member_id,
            step: RegistrationStep::Name,
            name: None,
            race: None,
            sex: None,
            started_at: Instant::now(),
        }
    }

    /// Applies one answer. On error the session stays on the same step.
    fn answer(&mut self, input: &str, game: &GameConfig) -> AppResult<Progress> {
        let input = input.trim();

        match self.step {
            RegistrationStep::Name => {
                validate_name(input)?;
                self.name = Some(input.to_string());
                self.step = RegistrationStep::Race;
            }
            RegistrationStep::Race => {
                let race = input.to_lowercase();
                game.race(&race)?;
                self.race = Some(race);
                self.step = RegistrationStep::Sex;
            }
            RegistrationStep::Sex => {
                let sex = input.to_lowercase();
                game.validate_sex(&sex)?;
                self.sex = Some(sex);
                self.step = RegistrationStep::Description;
            }
            RegistrationStep::Description => {
                validate_desc(input)?;
                let (Some(name), Some(race), Some(sex)) = (self.name.clone(), self.race.clone(), self.sex.clone()) else {
                    return Err(DomainError::InvariantViolated(format!(
                        "registration of {} reached the last step with missing answers",
                        self.member_id
                    )));
                };
                return Ok(Progress::Complete(CharacterDraft {
                    member_id: self.member_id.clone(),
                    name,
                    race,
                    sex,
                    desc: input.to_string(),
                }));
            }
        }

        Ok(Progress::Next(self.step))
    }
}

/// Registrations in progress, at most one per member.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<MemberId, RegistrationSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, member_id: &MemberId) -> AppResult<RegistrationStep> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(member_id) {
            return Err(DomainError::RegistrationInProgress(member_id.clone()));
        }

        let session = RegistrationSession::new(member_id.clone());
        let step = session.step;
        sessions.insert(member_id.clone(), session);
        Ok(step)
    }

    /// Feeds `input` to the member's current step. A completed registration is removed.
    pub fn answer(&self, member_id: &MemberId, input: &str, game: &GameConfig) -> AppResult<Progress> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(member_id)
            .ok_or_else(|| DomainError::NoRegistration(member_id.clone()))?;

        let progress = session.answer(input, game)?;
        if matches!(progress, Progress::Complete(_)) {
            sessions.remove(member_id);
        }
        Ok(progress)
    }

    pub fn cancel(&self, member_id: &MemberId) -> AppResult<()> {
        self.sessions
            .lock()
            .remove(member_id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NoRegistration(member_id.clone()))
    }

    pub fn current_step(&self, member_id: &MemberId) -> Option<RegistrationStep> {
        self.sessions.lock().get(member_id).map(|s| s.step)
    }

    pub fn is_active(&self, member_id: &MemberId) -> bool {
        self.sessions.lock().contains_key(member_id)
    }

    /// Drops sessions older than `max_age`. Returns how many were dropped.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.started_at.elapsed() < max_age);
        before - sessions.len()
    }
}
