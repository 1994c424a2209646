//! Test Data Builders
//!
//! Builders for clients, invoices and payments with sensible defaults, so a
//! test only spells out the fields it is about.

use chrono::NaiveDate;
use core_kernel::{CabinetId, ClientId, Currency, Money};
use rust_decimal::Decimal;

use domain_billing::{Invoice, InvoiceLedger, InvoiceStatus, NewPayment, Payment, PaymentMethod};
use domain_client::{Client, ClientStatus, ClientType, FiscalData, FiscalRegime};

use crate::fixtures::{DateFixtures, IdFixtures, StringFixtures};

/// Builder for [`Client`]
pub struct TestClientBuilder {
    cabinet_id: CabinetId,
    nom: String,
    niu: Option<String>,
    client_type: ClientType,
    regime: FiscalRegime,
    status: ClientStatus,
    email: Option<String>,
    telephone: Option<String>,
    ville: Option<String>,
    fiscal_data: Option<FiscalData>,
}

impl Default for TestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClientBuilder {
    pub fn new() -> Self {
        Self {
            cabinet_id: IdFixtures::cabinet_id(),
            nom: "Client Test".to_string(),
            niu: None,
            client_type: ClientType::Physique,
            regime: FiscalRegime::Reel,
            status: ClientStatus::Actif,
            email: None,
            telephone: None,
            ville: None,
            fiscal_data: None,
        }
    }

    pub fn cabinet(mut self, cabinet_id: CabinetId) -> Self {
        self.cabinet_id = cabinet_id;
        self
    }

    pub fn nom(mut self, nom: impl Into<String>) -> Self {
        self.nom = nom.into();
        self
    }

    pub fn niu(mut self, niu: impl Into<String>) -> Self {
        self.niu = Some(niu.into());
        self
    }

    /// Legal entity; a placeholder NIU is set if none was given
    pub fn morale(mut self) -> Self {
        self.client_type = ClientType::Morale;
        if self.niu.is_none() {
            self.niu = Some("M000000000000A".to_string());
        }
        self
    }

    pub fn regime(mut self, regime: FiscalRegime) -> Self {
        self.regime = regime;
        self
    }

    pub fn status(mut self, status: ClientStatus) -> Self {
        self.status = status;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn telephone(mut self, telephone: impl Into<String>) -> Self {
        self.telephone = Some(telephone.into());
        self
    }

    pub fn ville(mut self, ville: impl Into<String>) -> Self {
        self.ville = Some(ville.into());
        self
    }

    pub fn fiscal_data(mut self, data: FiscalData) -> Self {
        self.fiscal_data = Some(data);
        self
    }

    pub fn build(self) -> Client {
        let mut client = Client::new(self.cabinet_id, self.nom, self.client_type, self.regime);
        client.niu = self.niu;
        client.status = self.status;
        client.email = self.email;
        client.telephone = self.telephone;
        client.ville = self.ville;
        client.fiscal_data = self.fiscal_data;
        client
    }
}

/// Builder for [`Invoice`]
///
/// Without line items the invoice total is `montant`; with line items it is
/// their sum.
pub struct TestInvoiceBuilder {
    client_id: ClientId,
    numero: Option<String>,
    date_emission: NaiveDate,
    date_echeance: NaiveDate,
    currency: Currency,
    montant: Decimal,
    prestations: Vec<(String, Decimal)>,
    cancelled: bool,
}

impl TestInvoiceBuilder {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            numero: None,
            date_emission: DateFixtures::issued(),
            date_echeance: DateFixtures::future_due(),
            currency: Currency::XAF,
            montant: Decimal::from(50_000),
            prestations: Vec::new(),
            cancelled: false,
        }
    }

    pub fn numero(mut self, numero: impl Into<String>) -> Self {
        self.numero = Some(numero.into());
        self
    }

    pub fn issued(mut self, date: NaiveDate) -> Self {
        self.date_emission = date;
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.date_echeance = date;
        self
    }

    /// Due before [`DateFixtures::today`]
    pub fn overdue(self) -> Self {
        self.due(DateFixtures::past_due())
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn montant(mut self, montant: Decimal) -> Self {
        self.montant = montant;
        self
    }

    pub fn prestation(mut self, description: impl Into<String>, montant: Decimal) -> Self {
        self.prestations.push((description.into(), montant));
        self
    }

    /// The two standard line items
    pub fn standard_prestations(self) -> Self {
        self.prestation(StringFixtures::bookkeeping(), Decimal::from(30_000))
            .prestation(StringFixtures::tax_return(), Decimal::from(20_000))
    }

    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }

    /// # Panics
    ///
    /// Panics if a line item amount is not positive.
    pub fn build(self) -> Invoice {
        let currency = self.currency;
        let mut invoice = if self.prestations.is_empty() {
            Invoice::new(
                self.client_id,
                self.date_emission,
                self.date_echeance,
                Money::new(self.montant, currency),
            )
        } else {
            Invoice::with_prestations(
                self.client_id,
                self.date_emission,
                self.date_echeance,
                currency,
                self.prestations
                    .into_iter()
                    .map(|(description, montant)| (description, Money::new(montant, currency))),
            )
            .expect("test line items must be positive")
        };
        if let Some(numero) = self.numero {
            invoice = invoice.with_numero(numero);
        }
        if self.cancelled {
            invoice.status = InvoiceStatus::Annulee;
        }
        invoice
    }
}

/// Builder for payments and credits
pub struct TestPaymentBuilder {
    client_id: ClientId,
    invoice: Option<core_kernel::InvoiceId>,
    montant: Money,
    methode: PaymentMethod,
    date_paiement: NaiveDate,
    reference: Option<String>,
}

impl TestPaymentBuilder {
    /// Payment attached to `invoice`, in its currency
    pub fn for_invoice(invoice: &Invoice, montant: Decimal) -> Self {
        Self {
            client_id: invoice.client_id,
            invoice: Some(invoice.id),
            montant: Money::new(montant, invoice.currency()),
            methode: PaymentMethod::Especes,
            date_paiement: DateFixtures::today(),
            reference: None,
        }
    }

    /// Unattached FCFA credit
    pub fn credit(client_id: ClientId, montant: Decimal) -> Self {
        Self {
            client_id,
            invoice: None,
            montant: Money::xaf(montant),
            methode: PaymentMethod::Virement,
            date_paiement: DateFixtures::today(),
            reference: None,
        }
    }

    pub fn methode(mut self, methode: PaymentMethod) -> Self {
        self.methode = methode;
        self
    }

    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.date_paiement = date;
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// # Panics
    ///
    /// Panics if the amount is not positive.
    pub fn build(self) -> Payment {
        let payment = match self.invoice {
            Some(invoice_id) => Payment::new(self.client_id, invoice_id, self.montant, self.methode, self.date_paiement),
            None => Payment::credit(self.client_id, self.montant, self.methode, self.date_paiement),
        }
        .expect("test payment amount must be positive");
        match self.reference {
            Some(reference) => payment.with_reference(reference),
            None => payment,
        }
    }

    /// The same data as a [`NewPayment`] request
    pub fn request(self) -> NewPayment {
        NewPayment {
            montant: Some(self.montant),
            prestation_ids: Vec::new(),
            methode: self.methode,
            date_paiement: self.date_paiement,
            reference: self.reference,
            notes: None,
        }
    }
}

/// Ledger holding `invoice` and the given amounts already paid against it
pub fn ledger_with_payments(invoice: Invoice, amounts: &[Decimal]) -> InvoiceLedger {
    let payments = amounts
        .iter()
        .map(|amount| TestPaymentBuilder::for_invoice(&invoice, *amount).build())
        .collect();
    InvoiceLedger::new(invoice, payments)
}
