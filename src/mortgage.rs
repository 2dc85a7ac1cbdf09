//! Mortgage amortization engine.
//!
//! Pure function from loan parameters to a fully-computed payment summary.
//! No I/O, no shared state; identical inputs produce bit-identical results.
//! All figures are computed in full floating-point precision — rounding to
//! cents happens only at the presentation boundary via
//! [`MortgageResult::rounded`].

use serde::Serialize;

use crate::types::MortgageError;

// ---------------------------------------------------------------------------
// Configuration constants
// ---------------------------------------------------------------------------

/// Down payment assumed when the caller supplies neither amount nor percent.
const DEFAULT_DOWN_PAYMENT_PERCENT: f64 = 20.0;

/// Below this down-payment percentage, lenders require PMI.
const PMI_THRESHOLD_PERCENT: f64 = 20.0;

/// Annual PMI as a fraction of the loan amount. An approximation, not a
/// real insurer's rate table.
const PMI_ANNUAL_RATE: f64 = 0.007;

/// Estimated annual property tax as a fraction of home price, used when the
/// caller supplies no figure (varies by location; national average).
const PROPERTY_TAX_RATE: f64 = 0.011;

/// Estimated annual homeowners insurance as a fraction of home price.
const INSURANCE_RATE: f64 = 0.0035;

// ---------------------------------------------------------------------------
// Inputs / result
// ---------------------------------------------------------------------------

/// Loan parameters. Exactly one of `down_payment` / `down_payment_percent`
/// is authoritative: when both are given, the explicit amount wins and the
/// percent is derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct MortgageInputs {
    /// Price of the home in dollars. Must be positive.
    pub home_price: f64,
    /// Down payment amount in dollars.
    pub down_payment: Option<f64>,
    /// Down payment as a percentage of home price.
    pub down_payment_percent: Option<f64>,
    /// Loan term in years. Must be positive.
    pub loan_term_years: u32,
    /// Annual interest rate as a percentage.
    pub interest_rate_percent: f64,
    /// Annual property tax in dollars; estimated from home price if absent.
    pub annual_property_tax: Option<f64>,
    /// Annual homeowners insurance in dollars; estimated if absent.
    pub annual_homeowners_insurance: Option<f64>,
    /// Monthly HOA fees in dollars.
    pub monthly_hoa: f64,
    /// Whether to include PMI for down payments below the threshold.
    pub include_pmi: bool,
}

impl MortgageInputs {
    /// Inputs for the given home price with the conventional defaults:
    /// 30-year term, 6.5% rate, no HOA, PMI included when applicable.
    pub fn new(home_price: f64) -> Self {
        Self {
            home_price,
            down_payment: None,
            down_payment_percent: None,
            loan_term_years: 30,
            interest_rate_percent: 6.5,
            annual_property_tax: None,
            annual_homeowners_insurance: None,
            monthly_hoa: 0.0,
            include_pmi: true,
        }
    }
}

/// Fully-computed mortgage summary. Immutable value, recomputed on every
/// call — nothing is cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MortgageResult {
    pub home_price: f64,
    pub down_payment: f64,
    pub down_payment_percent: f64,
    pub loan_amount: f64,
    pub loan_term_years: u32,
    pub interest_rate_percent: f64,
    pub monthly_principal_interest: f64,
    pub monthly_pmi: f64,
    pub monthly_property_tax: f64,
    pub monthly_homeowners_insurance: f64,
    pub monthly_hoa: f64,
    /// Sum of all monthly components.
    pub monthly_payment: f64,
    pub total_interest_paid: f64,
    /// Lifetime sum of all monthly payments.
    pub total_of_payments: f64,
    /// Lifetime payments plus the down payment.
    pub total_cost: f64,
}

impl MortgageResult {
    /// Presentation copy with every monetary figure and the derived percent
    /// rounded to two decimal places. Internal math stays unrounded.
    pub fn rounded(&self) -> Self {
        Self {
            home_price: round2(self.home_price),
            down_payment: round2(self.down_payment),
            down_payment_percent: round2(self.down_payment_percent),
            loan_amount: round2(self.loan_amount),
            loan_term_years: self.loan_term_years,
            interest_rate_percent: self.interest_rate_percent,
            monthly_principal_interest: round2(self.monthly_principal_interest),
            monthly_pmi: round2(self.monthly_pmi),
            monthly_property_tax: round2(self.monthly_property_tax),
            monthly_homeowners_insurance: round2(self.monthly_homeowners_insurance),
            monthly_hoa: round2(self.monthly_hoa),
            monthly_payment: round2(self.monthly_payment),
            total_interest_paid: round2(self.total_interest_paid),
            total_of_payments: round2(self.total_of_payments),
            total_cost: round2(self.total_cost),
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct MortgageEngine;

impl MortgageEngine {
    /// Compute the full amortization summary for the given inputs.
    ///
    /// Fails fast on numerically-invalid input; a valid input set has no
    /// failure path.
    pub fn compute(inputs: &MortgageInputs) -> Result<MortgageResult, MortgageError> {
        if inputs.home_price <= 0.0 {
            return Err(MortgageError::InvalidInput(
                "home_price must be positive".to_string(),
            ));
        }
        if inputs.loan_term_years == 0 {
            return Err(MortgageError::InvalidInput(
                "loan_term_years must be positive".to_string(),
            ));
        }
        if inputs.interest_rate_percent < 0.0 {
            return Err(MortgageError::InvalidInput(
                "interest_rate_percent must not be negative".to_string(),
            ));
        }

        // Resolve down payment: explicit amount wins; percent is derived.
        let (down_payment, down_payment_percent) = match (inputs.down_payment, inputs.down_payment_percent) {
            (Some(amount), _) => (amount, amount / inputs.home_price * 100.0),
            (None, Some(percent)) => (inputs.home_price * percent / 100.0, percent),
            (None, None) => (
                inputs.home_price * DEFAULT_DOWN_PAYMENT_PERCENT / 100.0,
                DEFAULT_DOWN_PAYMENT_PERCENT,
            ),
        };

        if down_payment < 0.0 || down_payment > inputs.home_price {
            return Err(MortgageError::InvalidInput(
                "down payment must be between 0 and home_price".to_string(),
            ));
        }

        let loan_amount = inputs.home_price - down_payment;
        let monthly_rate = (inputs.interest_rate_percent / 100.0) / 12.0;
        let total_payments = (inputs.loan_term_years * 12) as f64;

        // Standard amortization formula; degenerates to P/n at zero rate to
        // avoid the division by zero in the closed form.
        let monthly_principal_interest = if monthly_rate > 0.0 {
            let growth = (1.0 + monthly_rate).powf(total_payments);
            loan_amount * (monthly_rate * growth) / (growth - 1.0)
        } else {
            loan_amount / total_payments
        };

        let monthly_pmi = if inputs.include_pmi && down_payment_percent < PMI_THRESHOLD_PERCENT {
            loan_amount * PMI_ANNUAL_RATE / 12.0
        } else {
            0.0
        };

        let annual_property_tax = inputs
            .annual_property_tax
            .unwrap_or(inputs.home_price * PROPERTY_TAX_RATE);
        let monthly_property_tax = annual_property_tax / 12.0;

        let annual_homeowners_insurance = inputs
            .annual_homeowners_insurance
            .unwrap_or(inputs.home_price * INSURANCE_RATE);
        let monthly_homeowners_insurance = annual_homeowners_insurance / 12.0;

        let monthly_payment = monthly_principal_interest
            + monthly_pmi
            + monthly_property_tax
            + monthly_homeowners_insurance
            + inputs.monthly_hoa;

        let total_interest_paid = monthly_principal_interest * total_payments - loan_amount;
        let total_of_payments = monthly_payment * total_payments;
        let total_cost = total_of_payments + down_payment;

        Ok(MortgageResult {
            home_price: inputs.home_price,
            down_payment,
            down_payment_percent,
            loan_amount,
            loan_term_years: inputs.loan_term_years,
            interest_rate_percent: inputs.interest_rate_percent,
            monthly_principal_interest,
            monthly_pmi,
            monthly_property_tax,
            monthly_homeowners_insurance,
            monthly_hoa: inputs.monthly_hoa,
            monthly_payment,
            total_interest_paid,
            total_of_payments,
            total_cost,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
