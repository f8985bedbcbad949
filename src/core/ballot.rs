//! Poll voting engine: options, single-vote-per-user casting, tallying, and winner selection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::config::MusterConfig;
use crate::core::audit::{build_audit_event, EntityKind, SharedAuditSink};
use crate::core::error::{MusterError, MusterResult};
use crate::core::model::{NewOption, Poll, PollOption, PollStatus, Vote};
use crate::core::render;
use crate::infra::notify::Notifier;
use crate::infra::store::PollStore;
use crate::util::clock::Clock;
use crate::util::ids::{OptionId, PollId, UserId};
use crate::util::locks::EntityLocks;

/// Vote count of one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyEntry {
    /// The option.
    pub option: PollOption,
    /// Live votes for it.
    pub votes: u32,
}

/// Vote counts of every option of a poll, ordered by option id.
///
/// Options without votes are present with a zero count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<TallyEntry>,
}

impl Tally {
    /// Count `votes` against `options`. Votes for unknown options are ignored.
    pub fn new(mut options: Vec<PollOption>, votes: &[Vote]) -> Self {
        options.sort_by_key(|o| o.id);
        let mut counts: HashMap<OptionId, u32> = HashMap::with_capacity(options.len());
        for vote in votes {
            *counts.entry(vote.option).or_default() += 1;
        }
        let entries = options
            .into_iter()
            .map(|option| {
                let votes = counts.get(&option.id).copied().unwrap_or(0);
                TallyEntry { option, votes }
            })
            .collect();
        Self { entries }
    }

    /// Entries in option-id order.
    pub fn entries(&self) -> &[TallyEntry] {
        &self.entries
    }

    /// Option id to vote count, zero counts included.
    pub fn counts(&self) -> BTreeMap<OptionId, u32> {
        self.entries.iter().map(|e| (e.option.id, e.votes)).collect()
    }

    /// Votes for one option; zero when unknown.
    pub fn votes_for(&self, id: OptionId) -> u32 {
        self.entries
            .iter()
            .find(|e| e.option.id == id)
            .map_or(0, |e| e.votes)
    }

    /// Total live votes.
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.votes).sum()
    }

    /// Highest count, zero for an empty poll.
    pub fn max_votes(&self) -> u32 {
        self.entries.iter().map(|e| e.votes).max().unwrap_or(0)
    }

    /// Whether the poll has no options.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest count wins; equal counts go to the lowest option id.
    pub fn winner(&self) -> Option<&TallyEntry> {
        let mut best: Option<&TallyEntry> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.votes > b.votes) {
                best = Some(entry);
            }
        }
        best
    }

    /// Options sharing a non-zero maximum, when there are at least two of them.
    pub fn tied(&self) -> Option<Vec<&TallyEntry>> {
        let max = self.max_votes();
        if max == 0 {
            return None;
        }
        let leaders: Vec<&TallyEntry> = self.entries.iter().filter(|e| e.votes == max).collect();
        (leaders.len() >= 2).then_some(leaders)
    }
}

/// Result of settling a poll without a tie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    /// Closed poll.
    pub poll: PollId,
    /// Winning option and its votes; `None` when the poll had no options.
    pub winner: Option<TallyEntry>,
    /// Whether the announcement reached the notifier.
    pub announced: bool,
}

/// Poll voting engine.
///
/// Every mutation of a poll (option added, vote cast, closure, runoff) runs under
/// that poll's entity lock, so checks against the poll status and option set
/// cannot interleave with a concurrent settlement.
pub struct PollEngine<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: Arc<MusterConfig>,
    locks: Arc<EntityLocks<PollId>>,
    audit: Option<SharedAuditSink>,
}

impl<S, N> PollEngine<S, N>
where
    S: PollStore,
    N: Notifier,
{
    /// Create an engine over the given collaborators.
    pub fn new(store: Arc<S>, notifier: Arc<N>, clock: Arc<dyn Clock>, config: Arc<MusterConfig>) -> Self {
        Self {
            store,
            notifier,
            clock,
            config,
            locks: Arc::new(EntityLocks::new()),
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn notifier(&self) -> &Arc<N> {
        &self.notifier
    }

    pub(crate) fn config(&self) -> &Arc<MusterConfig> {
        &self.config
    }

    pub(crate) fn locks(&self) -> &Arc<EntityLocks<PollId>> {
        &self.locks
    }

    pub(crate) fn audit(&self) -> Option<&SharedAuditSink> {
        self.audit.as_ref()
    }

    /// Take the poll's entity lock.
    pub(crate) async fn lock(&self, id: PollId) -> OwnedMutexGuard<()> {
        self.locks.acquire(&id).await
    }

    pub(crate) fn prune_locks(&self) -> usize {
        self.locks.prune_idle()
    }

    /// Create an open poll and publish its card to the polls channel.
    ///
    /// The poll is kept when the card cannot be published or its id not recorded.
    pub async fn create_poll(
        &self,
        title: &str,
        description: &str,
        deadline: DateTime<Utc>,
    ) -> MusterResult<Poll> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MusterError::Invalid("poll title must not be empty".into()));
        }
        let now = self.clock.now();
        let mut poll = Poll::new(title, description.trim(), deadline, now);
        self.store.insert_poll(poll.clone()).await?;
        self.record(poll.id, "create", None, None);
        tracing::info!("created poll {} '{}' closing at {}", poll.id, poll.title, poll.deadline);

        let content = render::poll_card(&poll, &Tally::default(), self.display_offset(), None);
        match self.notifier.notify(&self.config.channels.polls, &content).await {
            Ok(message) => match self.store.set_poll_message(poll.id, message.clone()).await {
                Ok(()) => poll.message = Some(message),
                Err(e) => tracing::warn!("poll {} card {} sent but not recorded: {}", poll.id, message, e),
            },
            Err(e) => tracing::warn!("poll {} card not published: {}", poll.id, e),
        }
        Ok(poll)
    }

    /// Fetch a poll or fail with `NotFound`.
    pub async fn get_poll(&self, id: PollId) -> MusterResult<Poll> {
        self.store
            .get_poll(id)
            .await?
            .ok_or_else(|| MusterError::NotFound(format!("poll {id}")))
    }

    /// Options of a poll ordered by id.
    pub async fn options(&self, id: PollId) -> MusterResult<Vec<PollOption>> {
        self.get_poll(id).await?;
        self.store.list_options(id).await
    }

    /// Most recently created open poll.
    pub async fn latest_open_poll(&self) -> MusterResult<Option<Poll>> {
        self.store.latest_open_poll().await
    }

    /// Propose an option. Titles are compared trimmed and case-insensitively.
    pub async fn add_option(
        &self,
        id: PollId,
        title: &str,
        link: Option<&str>,
        proposer: Option<UserId>,
    ) -> MusterResult<PollOption> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MusterError::Invalid("option title must not be empty".into()));
        }
        let link = link.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string);

        let _guard = self.lock(id).await;
        let poll = self.get_poll(id).await?;
        if !poll.is_open() {
            return Err(MusterError::Closed);
        }
        let wanted = normalize_title(title);
        let existing = self.store.list_options(id).await?;
        if existing.iter().any(|o| normalize_title(&o.title) == wanted) {
            return Err(MusterError::Duplicate(title.to_string()));
        }

        let option = self
            .store
            .insert_option(
                id,
                NewOption {
                    title: title.to_string(),
                    link,
                    proposer: proposer.clone(),
                },
            )
            .await?;
        self.record(id, "option", proposer.map(|p| p.0), Some(option.title.clone()));
        tracing::debug!("poll {} gained option {} '{}'", id, option.id, option.title);
        Ok(option)
    }

    /// Cast or move the user's single vote.
    pub async fn cast_vote(&self, id: PollId, user: UserId, option: OptionId) -> MusterResult<Vote> {
        let _guard = self.lock(id).await;
        let poll = self.get_poll(id).await?;
        if !poll.is_open() {
            return Err(MusterError::Closed);
        }
        let options = self.store.list_options(id).await?;
        if !options.iter().any(|o| o.id == option) {
            return Err(MusterError::NotFound(format!("option {option} in poll {id}")));
        }

        let vote = Vote {
            poll: id,
            user,
            option,
        };
        let previous = self.store.upsert_vote(vote.clone()).await?;
        self.record(
            id,
            "vote",
            Some(vote.user.0.clone()),
            Some(match previous {
                Some(prev) if prev != option => format!("{prev} -> {option}"),
                _ => option.to_string(),
            }),
        );
        Ok(vote)
    }

    /// The user's live vote.
    pub async fn user_vote(&self, id: PollId, user: &UserId) -> MusterResult<Option<OptionId>> {
        self.get_poll(id).await?;
        self.store.get_vote(id, user).await
    }

    /// Vote counts of every option.
    pub async fn tally(&self, id: PollId) -> MusterResult<Tally> {
        self.get_poll(id).await?;
        self.tally_unchecked(id).await
    }

    pub(crate) async fn tally_unchecked(&self, id: PollId) -> MusterResult<Tally> {
        let options = self.store.list_options(id).await?;
        let votes = self.store.list_votes(id).await?;
        Ok(Tally::new(options, &votes))
    }

    /// Leading option, ties going to the earliest proposal.
    pub async fn pick_winner(&self, id: PollId) -> MusterResult<Option<PollOption>> {
        Ok(self.tally(id).await?.winner().map(|e| e.option.clone()))
    }

    /// Tied finalists, or `None` when there is a single leader or no votes.
    pub async fn detect_tie(&self, id: PollId) -> MusterResult<Option<Vec<PollOption>>> {
        let tally = self.tally(id).await?;
        Ok(tally
            .tied()
            .map(|entries| entries.into_iter().map(|e| e.option.clone()).collect()))
    }

    /// Stop a poll by hand: close it now and announce the winner.
    pub async fn close_poll(&self, id: PollId) -> MusterResult<Closure> {
        let guard = self.lock(id).await;
        let poll = self.get_poll(id).await?;
        if !poll.is_open() {
            return Err(MusterError::Closed);
        }
        let tally = self.tally_unchecked(id).await?;
        let winner = self.mark_closed(&poll, &tally).await?;
        drop(guard);
        Ok(self.announce_closure(&poll, &tally, winner).await)
    }

    /// Persist `Closed`; caller holds the poll lock.
    pub(crate) async fn mark_closed(&self, poll: &Poll, tally: &Tally) -> MusterResult<Option<TallyEntry>> {
        self.store.set_poll_status(poll.id, PollStatus::Closed).await?;
        let winner = tally.winner().cloned();
        self.record(
            poll.id,
            "close",
            None,
            winner.as_ref().map(|w| format!("{} ({} votes)", w.option.title, w.votes)),
        );
        match &winner {
            Some(w) => tracing::info!("poll {} closed, winner '{}' with {} votes", poll.id, w.option.title, w.votes),
            None => tracing::info!("poll {} closed without options", poll.id),
        }
        Ok(winner)
    }

    /// Edit the card to its final form and post the result.
    pub(crate) async fn announce_closure(
        &self,
        poll: &Poll,
        tally: &Tally,
        winner: Option<TallyEntry>,
    ) -> Closure {
        let mut closed = poll.clone();
        closed.status = PollStatus::Closed;
        let polls = &self.config.channels.polls;
        let mut announced = true;

        if let Some(message) = &poll.message {
            let card = render::poll_card(&closed, tally, self.display_offset(), winner.as_ref());
            if let Err(e) = self.notifier.edit_message(polls, message, &card).await {
                tracing::warn!("poll {} final card not updated: {}", poll.id, e);
            }
        }

        let role = self.config.channels.poll_role.as_deref();
        let content = winner.as_ref().map_or_else(
            || render::no_winner_notice(poll),
            |w| render::winner_announcement(poll, w, role),
        );
        if let Err(e) = self.notifier.notify(polls, &content).await {
            tracing::error!("poll {} result not announced: {}", poll.id, e);
            announced = false;
        }

        Closure {
            poll: poll.id,
            winner,
            announced,
        }
    }

    /// Re-render the card of an open poll. Returns whether a card was edited.
    pub async fn refresh_card(&self, id: PollId) -> MusterResult<bool> {
        let poll = self.get_poll(id).await?;
        let Some(message) = &poll.message else {
            return Ok(false);
        };
        let tally = self.tally_unchecked(id).await?;
        let card = render::poll_card(&poll, &tally, self.display_offset(), None);
        self.notifier
            .edit_message(&self.config.channels.polls, message, &card)
            .await?;
        Ok(true)
    }

    pub(crate) fn display_offset(&self) -> chrono::FixedOffset {
        render::offset_or_utc(self.config.display_offset())
    }

    fn record(&self, id: PollId, action: &str, actor: Option<String>, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.lock().record(build_audit_event(
                EntityKind::Poll,
                id,
                action,
                actor,
                self.clock.now(),
                detail,
            ));
        }
    }
}

/// Case- and whitespace-insensitive form used for duplicate detection.
///
/// Uses full Unicode case folding, so "STRASSE" and "straße" compare equal.
pub fn normalize_title(title: &str) -> String {
    caseless::default_case_fold_str(title.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: u64) -> PollOption {
        PollOption {
            id: OptionId(id),
            poll: PollId::new(),
            title: format!("option-{id}"),
            link: None,
            proposer: None,
        }
    }

    fn tally_of(counts: &[(u64, u32)]) -> Tally {
        let poll = PollId::new();
        let options = counts.iter().map(|(id, _)| option(*id)).collect();
        let mut votes = Vec::new();
        for (id, n) in counts {
            for i in 0..*n {
                votes.push(Vote {
                    poll,
                    user: UserId(format!("u{id}-{i}")),
                    option: OptionId(*id),
                });
            }
        }
        Tally::new(options, &votes)
    }

    #[test]
    fn zero_vote_options_are_counted() {
        let tally = tally_of(&[(1, 2), (2, 0)]);
        let counts = tally.counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&OptionId(2)], 0);
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn winner_tie_goes_to_lowest_id() {
        let tally = tally_of(&[(2, 3), (1, 3)]);
        assert_eq!(tally.winner().unwrap().option.id, OptionId(1));
    }

    #[test]
    fn winner_of_empty_poll_is_none() {
        assert!(Tally::default().winner().is_none());
    }

    #[test]
    fn all_zero_winner_is_first_option() {
        let tally = tally_of(&[(1, 0), (2, 0)]);
        assert_eq!(tally.winner().unwrap().option.id, OptionId(1));
    }

    #[test]
    fn tie_detection() {
        let tied = tally_of(&[(1, 5), (2, 5), (3, 2)]);
        let ids: Vec<_> = tied.tied().unwrap().iter().map(|e| e.option.id).collect();
        assert_eq!(ids, vec![OptionId(1), OptionId(2)]);

        assert!(tally_of(&[(1, 5), (2, 0)]).tied().is_none());
        assert!(tally_of(&[(1, 0), (2, 0)]).tied().is_none());
        assert!(tally_of(&[(1, 4)]).tied().is_none());
    }

    #[test]
    fn title_normalization() {
        assert_eq!(normalize_title("  The Thing "), normalize_title("the thing"));
        assert_ne!(normalize_title("The Thing"), normalize_title("The Things"));
    }

    #[test]
    fn title_normalization_folds_unicode_case() {
        assert_eq!(normalize_title("STRASSE"), normalize_title("straße"));
        assert_eq!(normalize_title(" ΣΊΣΥΦΟΣ"), normalize_title("σίσυφος"));
    }
}
