//! Service registry: service → validator committee, fees and quorum.

use std::collections::HashMap;

use quorum_escrow_types::{AccountId, EscrowError, Result, Service, ServiceId};

/// Registered services. Entries are immutable once added.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<ServiceId, Service>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service with its validator committee.
    ///
    /// # Errors
    /// - `InvalidService` for an empty or duplicated validator set, a
    ///   threshold outside `[1, validators.len()]`, or fees above 100%
    /// - `DuplicateService` if `id` is already registered
    pub fn add_service(
        &mut self,
        id: ServiceId,
        validators: Vec<AccountId>,
        service_fee_bps: u16,
        validator_fee_bps: u16,
        quorum_threshold: usize,
    ) -> Result<&Service> {
        let service = Service::new(
            id,
            validators,
            service_fee_bps,
            validator_fee_bps,
            quorum_threshold,
        )?;
        if self.services.contains_key(&id) {
            return Err(EscrowError::DuplicateService(id));
        }

        tracing::info!(
            service = %id,
            validators = service.validators.len(),
            quorum_threshold,
            service_fee_bps,
            validator_fee_bps,
            "Service registered"
        );
        Ok(self.services.entry(id).or_insert(service))
    }

    #[must_use]
    pub fn get(&self, id: &ServiceId) -> Option<&Service> {
        self.services.get(id)
    }

    /// # Errors
    /// `ServiceNotFound` if `id` is unregistered.
    pub fn require(&self, id: &ServiceId) -> Result<&Service> {
        self.services.get(id).ok_or(EscrowError::ServiceNotFound(*id))
    }

    /// The validator committee of a service, in registration order.
    pub fn validators(&self, id: &ServiceId) -> Result<&[AccountId]> {
        self.require(id).map(|s| s.validators.as_slice())
    }

    /// Undo a registration.
    pub(crate) fn remove(&mut self, id: &ServiceId) -> Option<Service> {
        self.services.remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.services.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use quorum_escrow_types::ErrorKind;

    use super::*;

    fn committee(n: usize) -> Vec<AccountId> {
        (0..n).map(|_| AccountId::random()).collect()
    }

    #[test]
    fn add_and_lookup() {
        let mut reg = ServiceRegistry::new();
        let id = AccountId::random();
        let validators = committee(3);
        reg.add_service(id, validators.clone(), 3300, 3300, 2).unwrap();

        assert!(reg.contains(&id));
        assert_eq!(reg.validators(&id).unwrap(), validators.as_slice());
        assert_eq!(reg.require(&id).unwrap().quorum_threshold, 2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_service_rejected() {
        let mut reg = ServiceRegistry::new();
        let id = AccountId::random();
        reg.add_service(id, committee(1), 0, 0, 1).unwrap();
        let err = reg.add_service(id, committee(2), 100, 100, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        // Original entry untouched.
        assert_eq!(reg.validators(&id).unwrap().len(), 1);
    }

    #[test]
    fn invalid_parameters_rejected() {
        let mut reg = ServiceRegistry::new();
        let id = AccountId::random();
        for (validators, svc, val, threshold) in [
            (committee(0), 0, 0, 1),
            (committee(3), 0, 0, 0),
            (committee(3), 0, 0, 4),
            (committee(3), 6000, 4001, 2),
        ] {
            let err = reg.add_service(id, validators, svc, val, threshold).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_service_not_found() {
        let reg = ServiceRegistry::new();
        let err = reg.validators(&AccountId::random()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
