//! # Registry Engine
//!
//! The public operations of the registry: submission, appraisal, reward,
//! flagging, and the administrative operations.
//!
//! Every operation is one atomic unit:
//! 1. Open a `Transaction` over the store and check every precondition
//! 2. Stage all writes (and at most one value transfer)
//! 3. Execute the transfer; a failing transfer drops the staged writes
//! 4. Commit the `ChangeSet`; a failing commit reverses the transfer
//!
//! Nothing is visible to queries until step 4 succeeds.
//!
//! ## Scoring Asymmetry
//!
//! An appraisal moves the item score by the *delta* between the new and
//! the previous vote, but moves the voter's reputation by the *raw* vote.
//! Repeating a vote leaves the score alone and still moves reputation.

use crate::changeset::{ChangeSet, Transaction};
use crate::ledger::ValueTransfer;
use crate::primitives::{
    DEFAULT_SUBMISSION_CHARGE, DEFAULT_TOPICS, MAX_HEADLINE_LENGTH, MAX_HYPERLINK_LENGTH,
    MAX_TOPIC_LENGTH, MAX_TOPICS, MIN_HYPERLINK_LENGTH,
};
use crate::query;
use crate::store::RegistryStore;
use crate::{CallContext, EventRecord, Item, ItemId, Participant, RegistryEvent, VouchError, Vote};

// =============================================================================
// GENESIS
// =============================================================================

/// Initial configuration applied to an uninitialized store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genesis {
    /// Fixed protocol administrator.
    pub administrator: Participant,
    pub submission_charge: u64,
    pub topics: Vec<String>,
}

impl Genesis {
    /// Genesis with the default charge and catalog.
    #[must_use]
    pub fn new(administrator: Participant) -> Self {
        Self {
            administrator,
            submission_charge: DEFAULT_SUBMISSION_CHARGE,
            topics: DEFAULT_TOPICS.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    /// Override the genesis submission charge.
    #[must_use]
    pub fn with_charge(mut self, charge: u64) -> Self {
        self.submission_charge = charge;
        self
    }

    fn validate(&self) -> Result<(), VouchError> {
        if self.topics.len() > MAX_TOPICS {
            return Err(VouchError::InvalidInput(format!(
                "genesis catalog holds {} topics, maximum is {}",
                self.topics.len(),
                MAX_TOPICS
            )));
        }
        for topic in &self.topics {
            check_length("topic", topic, 1, MAX_TOPIC_LENGTH)?;
        }
        Ok(())
    }
}

/// A value transfer staged by an operation.
#[derive(Debug, Clone)]
struct PendingTransfer {
    from: Participant,
    to: Participant,
    amount: u64,
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), VouchError> {
    let len = value.len();
    if len == 0 {
        return Err(VouchError::InvalidInput(format!("{field} must not be empty")));
    }
    if len < min {
        return Err(VouchError::InvalidInput(format!(
            "{field} length {len} is below minimum {min}"
        )));
    }
    if len > max {
        return Err(VouchError::InvalidInput(format!(
            "{field} length {len} exceeds maximum {max}"
        )));
    }
    Ok(())
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The single writer over a registry store and a value-transfer ledger.
#[derive(Debug)]
pub struct Registry<S, L> {
    store: S,
    ledger: L,
    administrator: Participant,
}

impl<S: RegistryStore, L: ValueTransfer> Registry<S, L> {
    /// Open a registry, applying `genesis` if the store is uninitialized.
    ///
    /// An initialized store keeps its own charge and catalog; its recorded
    /// administrator must match `genesis.administrator`.
    pub fn open(mut store: S, ledger: L, genesis: Genesis) -> Result<Self, VouchError> {
        match store.administrator()? {
            Some(existing) if existing != genesis.administrator => {
                return Err(VouchError::Conflict(format!(
                    "store administered by {existing}, not {}",
                    genesis.administrator
                )));
            }
            Some(_) => {}
            None => {
                genesis.validate()?;
                let changes = ChangeSet {
                    administrator: Some(genesis.administrator.clone()),
                    appended_topics: genesis.topics.clone(),
                    submission_count: Some(0),
                    submission_charge: Some(genesis.submission_charge),
                    ..ChangeSet::default()
                };
                store.commit(changes)?;
                tracing::info!(
                    administrator = %genesis.administrator,
                    charge = genesis.submission_charge,
                    topics = genesis.topics.len(),
                    "registry initialized"
                );
            }
        }

        Ok(Self {
            store,
            ledger,
            administrator: genesis.administrator,
        })
    }

    /// The fixed protocol administrator.
    #[must_use]
    pub fn administrator(&self) -> &Participant {
        &self.administrator
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read access to the value-transfer ledger.
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Split the registry back into its parts.
    pub fn into_parts(self) -> (S, L) {
        (self.store, self.ledger)
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    /// Submit a new item, charging the current submission fee.
    pub fn submit(
        &mut self,
        ctx: &CallContext,
        headline: &str,
        hyperlink: &str,
        topic: &str,
    ) -> Result<ItemId, VouchError> {
        check_length("headline", headline, 1, MAX_HEADLINE_LENGTH)?;
        check_length(
            "hyperlink",
            hyperlink,
            MIN_HYPERLINK_LENGTH,
            MAX_HYPERLINK_LENGTH,
        )?;
        check_length("topic", topic, 1, MAX_TOPIC_LENGTH)?;

        let mut tx = Transaction::begin(&self.store, ctx.height);

        if !tx.topics()?.iter().any(|t| t == topic) {
            return Err(VouchError::InvalidInput(format!(
                "topic '{topic}' is not in the catalog"
            )));
        }

        let charge = tx.submission_charge()?;
        let available = self.ledger.balance(&ctx.caller);
        if available < charge {
            return Err(VouchError::InsufficientFunds {
                required: charge,
                available,
            });
        }

        let count = tx
            .submission_count()?
            .checked_add(1)
            .ok_or(VouchError::Overflow)?;
        let id = ItemId(count);

        tx.put_item(Item::new(
            id,
            ctx.caller.clone(),
            headline,
            hyperlink,
            topic,
            ctx.height,
        ));
        tx.set_submission_count(count);
        tx.emit(RegistryEvent::Submission {
            item: id,
            originator: ctx.caller.clone(),
        })?;

        let transfer = (charge > 0 && ctx.caller != self.administrator).then(|| PendingTransfer {
            from: ctx.caller.clone(),
            to: self.administrator.clone(),
            amount: charge,
        });

        let changes = tx.into_changes();
        self.commit(changes, transfer)?;
        Ok(id)
    }

    // =========================================================================
    // APPRAISAL
    // =========================================================================

    /// Cast or replace the caller's appraisal of an item.
    ///
    /// `value` must be `1` or `-1`.
    pub fn appraise(&mut self, ctx: &CallContext, id: ItemId, value: i64) -> Result<(), VouchError> {
        let vote = Vote::try_from(value)?;

        let mut tx = Transaction::begin(&self.store, ctx.height);
        let mut item = tx.item(id)?.ok_or(VouchError::NotFound(id))?;

        let previous = tx.appraisal(&ctx.caller, id)?;
        let delta = vote.value() - previous.map_or(0, Vote::value);

        item.score = item.score.checked_add(delta).ok_or(VouchError::Overflow)?;
        let reputation = tx
            .reputation(&ctx.caller)?
            .checked_add(vote.value())
            .ok_or(VouchError::Overflow)?;

        tx.put_item(item);
        tx.put_appraisal(&ctx.caller, id, vote);
        tx.put_reputation(&ctx.caller, reputation);
        tx.emit(RegistryEvent::Appraisal {
            item: id,
            participant: ctx.caller.clone(),
            vote,
            previous,
        })?;

        let changes = tx.into_changes();
        self.commit(changes, None)
    }

    // =========================================================================
    // REWARD
    // =========================================================================

    /// Tip the originator of an item.
    pub fn reward(&mut self, ctx: &CallContext, id: ItemId, amount: u64) -> Result<(), VouchError> {
        let mut tx = Transaction::begin(&self.store, ctx.height);
        let mut item = tx.item(id)?.ok_or(VouchError::NotFound(id))?;

        let available = self.ledger.balance(&ctx.caller);
        if available < amount {
            return Err(VouchError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        item.tips = item.tips.checked_add(amount).ok_or(VouchError::Overflow)?;
        let originator = item.originator.clone();
        tx.put_item(item);
        tx.emit(RegistryEvent::Reward {
            item: id,
            from: ctx.caller.clone(),
            to: originator.clone(),
            amount,
        })?;

        let transfer = PendingTransfer {
            from: ctx.caller.clone(),
            to: originator,
            amount,
        };
        let changes = tx.into_changes();
        self.commit(changes, Some(transfer))
    }

    // =========================================================================
    // FLAG
    // =========================================================================

    /// Flag an item for abuse. Repeated flags all count.
    pub fn flag(&mut self, ctx: &CallContext, id: ItemId) -> Result<(), VouchError> {
        let mut tx = Transaction::begin(&self.store, ctx.height);
        let mut item = tx.item(id)?.ok_or(VouchError::NotFound(id))?;

        if item.originator == ctx.caller {
            return Err(VouchError::SelfReferenceForbidden);
        }

        item.flags = item.flags.checked_add(1).ok_or(VouchError::Overflow)?;
        let flags = item.flags;
        tx.put_item(item);
        tx.emit(RegistryEvent::Flag {
            item: id,
            reporter: ctx.caller.clone(),
            flags,
        })?;

        let changes = tx.into_changes();
        self.commit(changes, None)
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Change the submission charge for future submissions.
    pub fn set_charge(&mut self, ctx: &CallContext, charge: u64) -> Result<(), VouchError> {
        self.require_admin(ctx)?;

        let mut tx = Transaction::begin(&self.store, ctx.height);
        let previous = tx.submission_charge()?;
        tx.set_submission_charge(charge);
        tx.emit(RegistryEvent::FeeChange {
            previous,
            current: charge,
        })?;

        let changes = tx.into_changes();
        self.commit(changes, None)
    }

    /// Delete an item record.
    ///
    /// The identifier stays consumed and appraisals of the item are kept.
    pub fn remove_item(&mut self, ctx: &CallContext, id: ItemId) -> Result<(), VouchError> {
        self.require_admin(ctx)?;

        let mut tx = Transaction::begin(&self.store, ctx.height);
        if tx.item(id)?.is_none() {
            return Err(VouchError::NotFound(id));
        }
        tx.delete_item(id);
        tx.emit(RegistryEvent::ItemRemoved { item: id })?;

        let changes = tx.into_changes();
        self.commit(changes, None)
    }

    /// Append a label to the topic catalog.
    ///
    /// A full catalog is rejected before the caller is checked.
    pub fn add_topic(&mut self, ctx: &CallContext, label: &str) -> Result<(), VouchError> {
        let mut tx = Transaction::begin(&self.store, ctx.height);
        let held = tx.topics()?.len();
        if held >= MAX_TOPICS {
            return Err(VouchError::InvalidInput(format!(
                "topic catalog is full ({held}/{MAX_TOPICS})"
            )));
        }

        self.require_admin(ctx)?;
        check_length("topic", label, 1, MAX_TOPIC_LENGTH)?;

        tx.append_topic(label);
        tx.emit(RegistryEvent::TopicAdded {
            label: label.to_string(),
        })?;

        let changes = tx.into_changes();
        self.commit(changes, None)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Lookup an item; `None` if never issued or removed.
    pub fn get_item(&self, id: ItemId) -> Result<Option<Item>, VouchError> {
        self.store.item(id)
    }

    /// Latest appraisal of `who` for `id`; `None` if they never voted.
    pub fn get_appraisal(&self, who: &Participant, id: ItemId) -> Result<Option<Vote>, VouchError> {
        self.store.appraisal(who, id)
    }

    /// Reputation of `who` (0 if they never voted).
    pub fn get_reputation(&self, who: &Participant) -> Result<i64, VouchError> {
        Ok(self.store.reputation(who)?.unwrap_or(0))
    }

    /// Number of items ever submitted.
    pub fn get_total(&self) -> Result<u64, VouchError> {
        self.store.submission_count()
    }

    /// Non-negative items among the first `min(limit, total, 10)` ids.
    pub fn get_top(&self, limit: u64) -> Result<Vec<Item>, VouchError> {
        query::top_items(&self.store, limit)
    }

    /// Current topic catalog.
    pub fn topics(&self) -> Result<Vec<String>, VouchError> {
        self.store.topics()
    }

    /// Current submission charge.
    pub fn charge(&self) -> Result<u64, VouchError> {
        self.store.submission_charge()
    }

    /// Journaled events starting at sequence `from`.
    pub fn events(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>, VouchError> {
        self.store.events(from, limit)
    }

    /// Height of the most recently committed event, 0 if none.
    pub fn last_height(&self) -> Result<u64, VouchError> {
        let count = self.store.event_count()?;
        if count == 0 {
            return Ok(0);
        }
        Ok(self
            .store
            .events(count, 1)?
            .first()
            .map(|record| record.height)
            .unwrap_or(0))
    }

    /// Native balance of a participant.
    pub fn balance(&self, who: &Participant) -> u64 {
        self.ledger.balance(who)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn require_admin(&self, ctx: &CallContext) -> Result<(), VouchError> {
        if ctx.caller != self.administrator {
            tracing::warn!(caller = %ctx.caller, "administrative call rejected");
            return Err(VouchError::Unauthorized);
        }
        Ok(())
    }

    /// Execute the staged transfer, then commit the staged writes.
    fn commit(
        &mut self,
        changes: ChangeSet,
        transfer: Option<PendingTransfer>,
    ) -> Result<(), VouchError> {
        if let Some(t) = &transfer {
            self.ledger.transfer(&t.from, &t.to, t.amount)?;
        }

        let events = changes.events.clone();
        if let Err(e) = self.store.commit(changes) {
            if let Some(t) = &transfer {
                if let Err(reversal) = self.ledger.transfer(&t.to, &t.from, t.amount) {
                    tracing::error!(
                        from = %t.to,
                        to = %t.from,
                        amount = t.amount,
                        error = %reversal,
                        "failed to reverse transfer after aborted commit"
                    );
                }
            }
            return Err(e);
        }

        for record in &events {
            tracing::info!(
                sequence = record.sequence,
                height = record.height,
                kind = record.event.kind(),
                "event committed"
            );
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
