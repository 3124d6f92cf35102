//! Scripted payment gateway for tests.

use async_trait::async_trait;
use rifa_core::gateway::{
    Charge, ChargeStatus, GatewayError, GatewayResult, NewCharge, PaymentGateway,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct GatewayState {
    counter: u32,
    statuses: HashMap<String, ChargeStatus>,
    fail_next_create: bool,
    created: Vec<NewCharge>,
}

/// Mock payment gateway.
///
/// Charges succeed with sequential ids (`charge-1`, `charge-2`, ...) and
/// start out Pending; tests drive the asynchronous outcome with
/// [`MockGateway::set_status`] and inject provider failures with
/// [`MockGateway::fail_next_create`].
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockGateway {
    /// Create a gateway with no charges.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_charge` call fail with a timeout.
    pub fn fail_next_create(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next_create = true;
        }
    }

    /// Script the status the provider reports for `charge_id`.
    pub fn set_status(&self, charge_id: &str, status: ChargeStatus) {
        if let Ok(mut state) = self.state.lock() {
            state.statuses.insert(charge_id.to_string(), status);
        }
    }

    /// Every charge request this gateway accepted, in order.
    #[must_use]
    pub fn created_charges(&self) -> Vec<NewCharge> {
        self.state
            .lock()
            .map(|state| state.created.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_charge(&self, request: &NewCharge) -> GatewayResult<Charge> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| GatewayError::RequestFailed("mock poisoned".to_string()))?;

        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(GatewayError::Timeout);
        }

        state.counter += 1;
        let id = format!("charge-{}", state.counter);
        state.statuses.insert(id.clone(), ChargeStatus::Pending);
        state.created.push(request.clone());

        Ok(Charge {
            pay_url: format!("https://pay.test/{id}"),
            id,
            status: ChargeStatus::Pending,
        })
    }

    async fn charge_status(&self, charge_id: &str) -> GatewayResult<ChargeStatus> {
        let state = self
            .state
            .lock()
            .map_err(|_| GatewayError::RequestFailed("mock poisoned".to_string()))?;

        state
            .statuses
            .get(charge_id)
            .copied()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                message: format!("charge {charge_id} not found"),
            })
    }
}
