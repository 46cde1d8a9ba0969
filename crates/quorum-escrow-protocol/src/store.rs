//! Process store: one process per (customer, product).
//!
//! Every state change goes through [`Process`] transition methods, so the
//! store only adds lookup, authorization and receipt bookkeeping.

use std::collections::{HashMap, HashSet};

use quorum_escrow_types::{
    AccountId, EscrowError, Process, ProcessKey, ProcessState, ProductId, ReceiptId, Result,
    ServiceId, TerminationAuthority,
};

use crate::registry::ServiceRegistry;

#[derive(Debug, Clone, Default)]
pub struct ProcessStore {
    processes: HashMap<ProcessKey, Process>,
    /// Ledger receipts already bound to a deposit.
    consumed_receipts: HashSet<ReceiptId>,
}

impl ProcessStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a process in `Created`.
    ///
    /// # Errors
    /// - `ServiceNotFound` if `service` is unregistered
    /// - `DuplicateProcess` if the customer already has a process for `product`
    /// - `InvalidProcess` if `cost` is zero or above the maximum
    pub fn create_process(
        &mut self,
        registry: &ServiceRegistry,
        customer: AccountId,
        service: ServiceId,
        product: ProductId,
        cost: u128,
        data: impl Into<String>,
    ) -> Result<&Process> {
        registry.require(&service)?;
        let key = ProcessKey::new(customer, product);
        if self.processes.contains_key(&key) {
            return Err(EscrowError::DuplicateProcess(key));
        }
        let process = Process::new(key, service, cost, data)?;

        tracing::info!(process = %key, service = %service, cost = %cost, "Process created");
        Ok(self.processes.entry(key).or_insert(process))
    }

    /// Record a deposit of `amount` against the process.
    ///
    /// # Errors
    /// - `ProcessNotFound`
    /// - `ReceiptAlreadyConsumed` if `receipt` funded an earlier deposit
    /// - `InvalidState` unless `Created`
    /// - `DepositMismatch` unless `amount` equals the cost exactly
    pub fn record_deposit(
        &mut self,
        key: &ProcessKey,
        amount: u128,
        receipt: Option<ReceiptId>,
    ) -> Result<&Process> {
        if let Some(id) = receipt.filter(|id| self.consumed_receipts.contains(id)) {
            return Err(EscrowError::ReceiptAlreadyConsumed(id));
        }
        let process = self
            .processes
            .get_mut(key)
            .ok_or(EscrowError::ProcessNotFound(*key))?;
        process.mark_deposited(amount, receipt)?;
        if let Some(id) = receipt {
            self.consumed_receipts.insert(id);
        }

        tracing::info!(process = %key, amount = %amount, "Deposit recorded");
        Ok(process)
    }

    /// Bind the receipt of a transfer made after the deposit was recorded.
    pub fn bind_receipt(&mut self, key: &ProcessKey, receipt: ReceiptId) -> Result<()> {
        if self.consumed_receipts.contains(&receipt) {
            return Err(EscrowError::ReceiptAlreadyConsumed(receipt));
        }
        self.require_mut(key)?.deposit_receipt = Some(receipt);
        self.consumed_receipts.insert(receipt);
        Ok(())
    }

    /// Put back the process at `key` as it was before a failed
    /// transaction: `prior` replaces it, or it is removed if `None`. A
    /// receipt consumed since then is released.
    pub(crate) fn restore(&mut self, key: ProcessKey, prior: Option<Process>) {
        let current = self.processes.get(&key).and_then(|p| p.deposit_receipt);
        let previous = prior.as_ref().and_then(|p| p.deposit_receipt);
        if let Some(receipt) = current.filter(|r| Some(*r) != previous) {
            self.consumed_receipts.remove(&receipt);
        }
        match prior {
            Some(process) => {
                self.processes.insert(key, process);
            }
            None => {
                self.processes.remove(&key);
            }
        }
    }

    #[must_use]
    pub fn is_receipt_consumed(&self, receipt: &ReceiptId) -> bool {
        self.consumed_receipts.contains(receipt)
    }

    /// Append an action entry on behalf of the process's service.
    /// Returns the entry's index in the action log.
    ///
    /// # Errors
    /// - `ProcessNotFound`
    /// - `Unauthorized` unless `caller` is the process's service
    /// - `InvalidState` unless `Deposited` or `Terminating`
    pub fn declare_action(
        &mut self,
        caller: AccountId,
        key: &ProcessKey,
        data: impl Into<String>,
    ) -> Result<usize> {
        let process = self.require_mut(key)?;
        if caller != process.service {
            return Err(EscrowError::Unauthorized {
                caller,
                action: "declare actions on this process",
            });
        }
        process.append_action(data)?;

        let index = process.action_log.len() - 1;
        tracing::debug!(process = %key, index, "Action declared");
        Ok(index)
    }

    /// `Deposited → Terminating`, requested by whoever `authority` names.
    ///
    /// # Errors
    /// - `ProcessNotFound`
    /// - `InvalidState` unless `Deposited`
    /// - `Unauthorized` if `caller` is not the party `authority` names
    pub fn start_termination(
        &mut self,
        caller: AccountId,
        key: &ProcessKey,
        authority: TerminationAuthority,
    ) -> Result<&Process> {
        let process = self.require_mut(key)?;
        process.require_state("start termination of", &[ProcessState::Deposited])?;
        let permitted = match authority {
            TerminationAuthority::Customer => key.customer,
            TerminationAuthority::Service => process.service,
        };
        if caller != permitted {
            return Err(EscrowError::Unauthorized {
                caller,
                action: "start termination of this process",
            });
        }
        process.start_termination()?;

        tracing::info!(process = %key, initiator = %caller, %authority, "Termination started");
        Ok(process)
    }

    #[must_use]
    pub fn get(&self, key: &ProcessKey) -> Option<&Process> {
        self.processes.get(key)
    }

    /// # Errors
    /// `ProcessNotFound` if no process exists for `key`.
    pub fn require(&self, key: &ProcessKey) -> Result<&Process> {
        self.processes.get(key).ok_or(EscrowError::ProcessNotFound(*key))
    }

    /// # Errors
    /// `ProcessNotFound` if no process exists for `key`.
    pub fn require_mut(&mut self, key: &ProcessKey) -> Result<&mut Process> {
        self.processes
            .get_mut(key)
            .ok_or(EscrowError::ProcessNotFound(*key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use quorum_escrow_types::ErrorKind;

    use super::*;

    struct Fixture {
        registry: ServiceRegistry,
        store: ProcessStore,
        service: ServiceId,
        customer: AccountId,
        product: ProductId,
    }

    fn fixture() -> Fixture {
        let mut registry = ServiceRegistry::new();
        let service = AccountId::random();
        registry
            .add_service(service, vec![AccountId::random()], 3300, 3300, 1)
            .unwrap();
        Fixture {
            registry,
            store: ProcessStore::new(),
            service,
            customer: AccountId::random(),
            product: ProductId::from_content("123"),
        }
    }

    fn created(f: &mut Fixture) -> ProcessKey {
        f.store
            .create_process(&f.registry, f.customer, f.service, f.product, 100, "{}")
            .unwrap()
            .key
    }

    #[test]
    fn create_then_duplicate() {
        let mut f = fixture();
        let key = created(&mut f);
        assert_eq!(f.store.get(&key).unwrap().state, ProcessState::Created);

        let err = f
            .store
            .create_process(&f.registry, f.customer, f.service, f.product, 100, "{}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(f.store.len(), 1);
    }

    #[test]
    fn create_for_unknown_service() {
        let mut f = fixture();
        let err = f
            .store
            .create_process(&f.registry, f.customer, AccountId::random(), f.product, 100, "{}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(f.store.is_empty());
    }

    #[test]
    fn create_with_zero_cost() {
        let mut f = fixture();
        let err = f
            .store
            .create_process(&f.registry, f.customer, f.service, f.product, 0, "{}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn receipt_consumed_once() {
        let mut f = fixture();
        let key = created(&mut f);
        let receipt = ReceiptId::new();
        f.store.record_deposit(&key, 100, Some(receipt)).unwrap();
        assert!(f.store.is_receipt_consumed(&receipt));

        let other = ProcessKey::new(f.customer, ProductId::from_content("456"));
        f.store
            .create_process(&f.registry, f.customer, f.service, other.product, 100, "{}")
            .unwrap();
        let err = f.store.record_deposit(&other, 100, Some(receipt)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(f.store.get(&other).unwrap().state, ProcessState::Created);
    }

    #[test]
    fn mismatched_deposit_leaves_receipt_unconsumed() {
        let mut f = fixture();
        let key = created(&mut f);
        let receipt = ReceiptId::new();
        let err = f.store.record_deposit(&key, 99, Some(receipt)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(!f.store.is_receipt_consumed(&receipt));
    }

    #[test]
    fn restore_releases_receipt_and_state() {
        let mut f = fixture();
        let key = created(&mut f);
        let prior = f.store.get(&key).cloned();
        let receipt = ReceiptId::new();
        f.store.record_deposit(&key, 100, Some(receipt)).unwrap();

        f.store.restore(key, prior);
        assert_eq!(f.store.get(&key).unwrap().state, ProcessState::Created);
        assert!(!f.store.is_receipt_consumed(&receipt));

        f.store.restore(key, None);
        assert!(f.store.get(&key).is_none());
    }

    #[test]
    fn only_service_declares_actions() {
        let mut f = fixture();
        let key = created(&mut f);
        f.store.record_deposit(&key, 100, None).unwrap();

        let err = f.store.declare_action(f.customer, &key, "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(f.store.declare_action(f.service, &key, "first").unwrap(), 0);
        assert_eq!(f.store.declare_action(f.service, &key, "second").unwrap(), 1);
    }

    #[test]
    fn declare_before_deposit_is_state_error() {
        let mut f = fixture();
        let key = created(&mut f);
        let err = f.store.declare_action(f.service, &key, "early").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn termination_authority_customer() {
        let mut f = fixture();
        let key = created(&mut f);
        f.store.record_deposit(&key, 100, None).unwrap();

        let err = f
            .store
            .start_termination(f.service, &key, TerminationAuthority::Customer)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        f.store
            .start_termination(f.customer, &key, TerminationAuthority::Customer)
            .unwrap();
        assert_eq!(f.store.get(&key).unwrap().state, ProcessState::Terminating);
    }

    #[test]
    fn termination_authority_service() {
        let mut f = fixture();
        let key = created(&mut f);
        f.store.record_deposit(&key, 100, None).unwrap();

        let err = f
            .store
            .start_termination(f.customer, &key, TerminationAuthority::Service)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        f.store
            .start_termination(f.service, &key, TerminationAuthority::Service)
            .unwrap();
    }

    #[test]
    fn termination_state_checked_before_authority() {
        let mut f = fixture();
        let key = created(&mut f);
        let err = f
            .store
            .start_termination(AccountId::random(), &key, TerminationAuthority::Customer)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }
}
