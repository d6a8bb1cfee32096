use serde::Serialize;

/// Cash balance arithmetic. Validation happens before anything reaches here.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Account {
    initial_balance: f64,
    balance: f64,
}

impl Account {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            initial_balance,
            balance: initial_balance,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Balance change since the session started
    pub fn profit(&self) -> f64 {
        self.balance - self.initial_balance
    }

    pub fn add(&mut self, amount: f64) {
        self.balance += amount;
    }

    pub fn subtract(&mut self, amount: f64) {
        self.balance -= amount;
    }
}
