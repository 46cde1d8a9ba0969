//! # `EscrowProtocol`: the transactional surface
//!
//! Every mutating call is all-or-nothing. Before it runs, the protocol
//! opens a ledger transaction and records a savepoint holding the event
//! count and the one service or process the call may change. On `Err` the
//! ledger is rolled back and the savepoint restored. Registry, processes,
//! votes, events and balances end up exactly as they were, even when the
//! ledger fails halfway through a settlement.
//!
//! The cost of a call depends on what it touches, not on how much history
//! the protocol has accumulated.
//!
//! Calls take `&mut self`, so no operation can observe or re-enter another
//! one in progress.

use std::collections::HashMap;

use quorum_escrow_ledger::{TokenLedger, TransferReceipt};
use quorum_escrow_settlement::{RewardPolicy, SettlementEngine, policy_for};
use quorum_escrow_types::{
    AccountId, EscrowError, EventRecord, Process, ProcessKey, ProcessState, ProductId,
    ProtocolConfig, ProtocolEvent, ReceiptId, Result, Service, ServiceId, Settlement, Tally,
    VoteChoice, constants,
};

use crate::events::EventLog;
use crate::quorum::{QuorumOutcome, ValidationQuorum};
use crate::registry::ServiceRegistry;
use crate::store::ProcessStore;

/// Everything a transaction may touch.
#[derive(Debug)]
pub(crate) struct ProtocolState<L> {
    registry: ServiceRegistry,
    store: ProcessStore,
    engine: SettlementEngine,
    events: EventLog,
    settlements: HashMap<ProcessKey, Settlement>,
    ledger: L,
}

/// The part of the state an operation may change, besides the ledger.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Ledger,
    Service(ServiceId),
    Process(ProcessKey),
}

/// Pre-operation values of everything in a [`Scope`].
#[derive(Debug)]
struct Savepoint {
    events: usize,
    /// Set when the service did not exist yet.
    new_service: Option<ServiceId>,
    process: Option<(ProcessKey, Option<Process>)>,
}

impl<L: TokenLedger> ProtocolState<L> {
    fn savepoint(&self, scope: Scope) -> Savepoint {
        let new_service = match scope {
            Scope::Service(id) if !self.registry.contains(&id) => Some(id),
            _ => None,
        };
        let process = match scope {
            Scope::Process(key) => Some((key, self.store.get(&key).cloned())),
            _ => None,
        };
        Savepoint {
            events: self.events.len(),
            new_service,
            process,
        }
    }

    fn restore(&mut self, savepoint: Savepoint) {
        self.events.truncate(savepoint.events);
        if let Some(id) = savepoint.new_service {
            self.registry.remove(&id);
        }
        if let Some((key, prior)) = savepoint.process {
            // A settlement record exists only for a process settled before.
            if !prior.as_ref().is_some_and(|p| p.settled) {
                self.settlements.remove(&key);
            }
            self.store.restore(key, prior);
        }
    }
}

/// What a successful vote did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Recorded; the process is still terminating.
    Pending { approvals: usize, threshold: usize },
    /// This vote reached the quorum and the process was settled.
    Settled(Box<Settlement>),
}

/// Escrow protocol over a token ledger `L`.
pub struct EscrowProtocol<L: TokenLedger> {
    config: ProtocolConfig,
    policy: Box<dyn RewardPolicy>,
    state: ProtocolState<L>,
}

/// Refuse the escrow account in a role that would let it fund or receive
/// from itself.
fn ensure_not_escrow(
    cfg: &ProtocolConfig,
    account: AccountId,
    action: &'static str,
) -> Result<()> {
    if account == cfg.escrow_account {
        return Err(EscrowError::Unauthorized {
            caller: account,
            action,
        });
    }
    Ok(())
}

impl<L: TokenLedger> EscrowProtocol<L> {
    /// Build a protocol over `ledger` with the reward policy named in `config`.
    ///
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(config: ProtocolConfig, ledger: L) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            protocol = constants::PROTOCOL_NAME,
            version = constants::VERSION,
            escrow = %config.escrow_account,
            termination_authority = %config.termination_authority,
            reward_policy = ?config.reward_policy,
            "Escrow protocol initialized"
        );
        Ok(Self {
            policy: policy_for(config.reward_policy),
            state: ProtocolState {
                registry: ServiceRegistry::new(),
                store: ProcessStore::new(),
                engine: SettlementEngine::new(
                    config.escrow_account,
                    config.idempotency_cache_size,
                ),
                events: EventLog::new(),
                settlements: HashMap::new(),
                ledger,
            },
            config,
        })
    }

    /// Replace the configured reward policy.
    #[must_use]
    pub fn with_reward_policy(mut self, policy: Box<dyn RewardPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Run `op`; keep its effects only if it returns `Ok`.
    fn transact<T>(
        &mut self,
        operation: &'static str,
        scope: Scope,
        op: impl FnOnce(&mut ProtocolState<L>, &ProtocolConfig, &dyn RewardPolicy) -> Result<T>,
    ) -> Result<T> {
        let savepoint = self.state.savepoint(scope);
        self.state.ledger.begin();
        match op(&mut self.state, &self.config, &*self.policy) {
            Ok(value) => {
                self.state.ledger.commit();
                Ok(value)
            }
            Err(e) => {
                self.state.ledger.rollback();
                self.state.restore(savepoint);
                tracing::warn!(operation, kind = %e.kind(), error = %e, "Operation rejected");
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Mutating operations
    // ---------------------------------------------------------------------

    /// Register a service with its validator committee, fees and quorum.
    ///
    /// # Errors
    /// `InvalidService` also when the escrow account is named as the service
    /// or as a validator: payouts to it would never leave escrow.
    pub fn add_service(
        &mut self,
        service: ServiceId,
        validators: Vec<AccountId>,
        service_fee_bps: u16,
        validator_fee_bps: u16,
        quorum_threshold: usize,
    ) -> Result<Service> {
        self.transact("add_service", Scope::Service(service), |s, cfg, _| {
            if service == cfg.escrow_account || validators.contains(&cfg.escrow_account) {
                return Err(EscrowError::InvalidService {
                    reason: "the escrow account cannot be a service or a validator".to_string(),
                });
            }
            let added = s
                .registry
                .add_service(
                    service,
                    validators,
                    service_fee_bps,
                    validator_fee_bps,
                    quorum_threshold,
                )?
                .clone();
            s.events.append(ProtocolEvent::ServiceAdded {
                service,
                validators: added.validators.clone(),
                quorum_threshold,
            });
            Ok(added)
        })
    }

    /// Open a process for `(customer, product)` with `service`.
    ///
    /// # Errors
    /// `Unauthorized` if `customer` is the escrow account, otherwise as
    /// [`ProcessStore::create_process`].
    pub fn create_process(
        &mut self,
        customer: AccountId,
        service: ServiceId,
        product: ProductId,
        cost: u128,
        data: impl Into<String>,
    ) -> Result<Process> {
        let key = ProcessKey::new(customer, product);
        self.transact("create_process", Scope::Process(key), |s, cfg, _| {
            ensure_not_escrow(cfg, customer, "open a process as the escrow account")?;
            let process = s
                .store
                .create_process(&s.registry, customer, service, product, cost, data)?
                .clone();
            s.events.append(ProtocolEvent::ProcessCreated { key, service, cost });
            Ok(process)
        })
    }

    /// Fund the customer's process: move exactly its cost from `customer`
    /// into escrow and mark it `Deposited`.
    ///
    /// # Errors
    /// - `Unauthorized` if `customer` is the escrow account
    /// - `ProcessNotFound`
    /// - `InvalidState` unless `Created`
    /// - `InsufficientBalance` if the customer cannot cover the cost
    pub fn deposit(&mut self, customer: AccountId, product: ProductId) -> Result<TransferReceipt> {
        let key = ProcessKey::new(customer, product);
        self.transact("deposit", Scope::Process(key), |s, cfg, _| {
            ensure_not_escrow(cfg, customer, "deposit from the escrow account")?;
            let cost = s.store.require(&key)?.cost;
            s.store.record_deposit(&key, cost, None)?;
            let receipt = s.ledger.transfer(customer, cfg.escrow_account, cost)?;
            s.store.bind_receipt(&key, receipt.id)?;
            s.events.append(ProtocolEvent::DepositRecorded {
                key,
                amount: cost,
                receipt: Some(receipt.id),
            });
            Ok(receipt)
        })
    }

    /// Bind an earlier ledger transfer into escrow to the process at `key`.
    ///
    /// # Errors
    /// - `ProcessNotFound`, `ReceiptNotFound`
    /// - `ReceiptAlreadyConsumed` if the transfer funded another deposit
    /// - `Unauthorized` unless `caller` is the customer and the transfer
    ///   went from the customer to the escrow account
    /// - `InvalidState` unless `Created`
    /// - `DepositMismatch` unless the transfer equals the cost exactly
    pub fn confirm_deposit(
        &mut self,
        caller: AccountId,
        key: ProcessKey,
        receipt_id: ReceiptId,
    ) -> Result<Process> {
        self.transact("confirm_deposit", Scope::Process(key), |s, cfg, _| {
            s.store.require(&key)?;
            let receipt = s
                .ledger
                .receipt(&receipt_id)
                .cloned()
                .ok_or(EscrowError::ReceiptNotFound(receipt_id))?;
            if s.store.is_receipt_consumed(&receipt_id) {
                return Err(EscrowError::ReceiptAlreadyConsumed(receipt_id));
            }
            ensure_not_escrow(cfg, receipt.from, "fund a deposit from the escrow account")?;
            if caller != key.customer
                || receipt.from != key.customer
                || receipt.to != cfg.escrow_account
            {
                return Err(EscrowError::Unauthorized {
                    caller,
                    action: "confirm this transfer as a deposit",
                });
            }
            let process = s
                .store
                .record_deposit(&key, receipt.amount, Some(receipt_id))?
                .clone();
            s.events.append(ProtocolEvent::DepositRecorded {
                key,
                amount: receipt.amount,
                receipt: Some(receipt_id),
            });
            Ok(process)
        })
    }

    /// Append an opaque action entry; only the process's service may.
    /// Returns the entry's index.
    pub fn declare_action(
        &mut self,
        caller: AccountId,
        key: ProcessKey,
        data: impl Into<String>,
    ) -> Result<usize> {
        self.transact("declare_action", Scope::Process(key), |s, _, _| {
            let index = s.store.declare_action(caller, &key, data)?;
            s.events.append(ProtocolEvent::ActionDeclared { key, index });
            Ok(index)
        })
    }

    /// `Deposited → Terminating`. Who may call is set by
    /// [`ProtocolConfig::termination_authority`].
    pub fn start_termination(&mut self, caller: AccountId, key: ProcessKey) -> Result<()> {
        self.transact("start_termination", Scope::Process(key), |s, cfg, _| {
            let service = s
                .store
                .start_termination(caller, &key, cfg.termination_authority)?
                .service;
            s.events.append(ProtocolEvent::TerminationStarted {
                key,
                service,
                initiator: caller,
            });
            Ok(())
        })
    }

    /// Cast `validator`'s vote. The approval that reaches the service's
    /// quorum settles the process within the same transaction.
    ///
    /// # Errors
    /// - `ProcessNotFound`
    /// - `InvalidState` unless `Terminating`; every vote after settlement
    /// - `Unauthorized` unless `validator` is on the service's committee
    /// - `DuplicateVote` on a second vote by the same validator
    /// - any settlement error, in which case the vote is rolled back too
    #[doc(alias = "validate_termination")]
    pub fn vote(
        &mut self,
        validator: AccountId,
        key: ProcessKey,
        approve: bool,
    ) -> Result<VoteOutcome> {
        let choice = VoteChoice::from_approve(approve);
        self.transact("vote", Scope::Process(key), |s, _, policy| {
            let process = s.store.require_mut(&key)?;
            let service = s.registry.require(&process.service)?;
            let outcome = ValidationQuorum::cast_vote(process, service, validator, choice)?;
            s.events.append(ProtocolEvent::VoteCast {
                key,
                validator,
                choice,
            });

            match outcome {
                QuorumOutcome::Pending {
                    approvals,
                    threshold,
                } => Ok(VoteOutcome::Pending {
                    approvals,
                    threshold,
                }),
                QuorumOutcome::Reached => {
                    let settlement = s.engine.settle(&mut s.ledger, policy, process, service)?;
                    s.events.append(ProtocolEvent::Settled {
                        key,
                        service_amount: settlement.service_amount,
                        validator_total: settlement.validator_total(),
                        burn_amount: settlement.burn_amount,
                    });
                    s.settlements.insert(key, settlement.clone());
                    Ok(VoteOutcome::Settled(Box::new(settlement)))
                }
            }
        })
    }

    /// Plain token transfer on the underlying ledger, e.g. a customer
    /// paying into escrow before [`confirm_deposit`](Self::confirm_deposit).
    ///
    /// Moving funds out of the escrow account is refused; only settlement
    /// may do that.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<TransferReceipt> {
        self.transact("transfer", Scope::Ledger, |s, cfg, _| {
            ensure_not_escrow(cfg, from, "transfer out of escrow")?;
            s.ledger.transfer(from, to, amount)
        })
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Current state of the process at `key`.
    pub fn get_state(&self, key: &ProcessKey) -> Result<ProcessState> {
        self.state.store.require(key).map(|p| p.state)
    }

    /// Validator committee of `service`, in registration order.
    pub fn get_validators(&self, service: &ServiceId) -> Result<&[AccountId]> {
        self.state.registry.validators(service)
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.state.registry.get(id)
    }

    pub fn process(&self, key: &ProcessKey) -> Option<&Process> {
        self.state.store.get(key)
    }

    pub fn tally(&self, key: &ProcessKey) -> Option<&Tally> {
        self.process(key).map(|p| &p.tally)
    }

    pub fn settlement(&self, key: &ProcessKey) -> Option<&Settlement> {
        self.state.settlements.get(key)
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.state.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.state.ledger.total_supply()
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    /// Events recorded after sequence number `seq`.
    pub fn events_since(&self, seq: u64) -> &[EventRecord] {
        self.state.events.since(seq)
    }

    pub fn ledger(&self) -> &L {
        &self.state.ledger
    }

    pub fn engine(&self) -> &SettlementEngine {
        &self.state.engine
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn escrow_account(&self) -> AccountId {
        self.config.escrow_account
    }

    pub fn reward_policy(&self) -> &'static str {
        self.policy.name()
    }

    /// Tear down, returning the ledger.
    pub fn into_ledger(self) -> L {
        self.state.ledger
    }
}

impl<L: TokenLedger + std::fmt::Debug> std::fmt::Debug for EscrowProtocol<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowProtocol")
            .field("config", &self.config)
            .field("reward_policy", &self.policy.name())
            .field("state", &self.state)
            .finish()
    }
}
