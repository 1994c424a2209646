//! Payment reminders
//!
//! A reminder lists the overdue invoices of one client with what is still
//! owed on each. Text is rendered from Fluent resources so the firm can send
//! French or English reminders; delivery goes through the
//! [`ReminderGateway`](crate::ports::ReminderGateway) port.

use chrono::NaiveDate;
use fluent::{FluentArgs, FluentBundle, FluentResource};
use serde::{Deserialize, Serialize};
use std::fmt;
use unic_langid::{langid, LanguageIdentifier};

use core_kernel::{ClientId, Money};
use domain_client::Client;

use crate::error::BillingError;
use crate::ports::ReminderGateway;
use crate::reconciliation::InvoiceBalance;

const FR_FTL: &str = r#"
reminder-subject = Relance : { $count } facture(s) en retard
reminder-greeting = Bonjour { $nom },
reminder-intro = Sauf erreur de notre part, les factures suivantes restent impayées :
reminder-line = - { $numero } échue le { $echeance } ({ $days } jour(s) de retard) : { $restant }
reminder-total = Total dû : { $total }
reminder-closing = Merci de régulariser votre situation dans les meilleurs délais.
"#;

const EN_FTL: &str = r#"
reminder-subject = Reminder: { $count } overdue invoice(s)
reminder-greeting = Dear { $nom },
reminder-intro = According to our records, the following invoices remain unpaid:
reminder-line = - { $numero } due on { $echeance } ({ $days } day(s) overdue): { $restant }
reminder-total = Total due: { $total }
reminder-closing = Please settle your account at your earliest convenience.
"#;

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderChannel {
    Email,
    Sms,
}

impl fmt::Display for ReminderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderChannel::Email => f.write_str("email"),
            ReminderChannel::Sms => f.write_str("sms"),
        }
    }
}

/// Language of the reminder text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
}

impl Locale {
    fn language(&self) -> LanguageIdentifier {
        match self {
            Locale::Fr => langid!("fr"),
            Locale::En => langid!("en"),
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Locale::Fr => FR_FTL,
            Locale::En => EN_FTL,
        }
    }
}

/// One overdue invoice in a reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderLine {
    pub numero: String,
    pub date_echeance: NaiveDate,
    pub montant_restant: Money,
    pub days_overdue: i64,
}

/// A rendered reminder ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub client_id: ClientId,
    pub channel: ReminderChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub lines: Vec<ReminderLine>,
    /// One total per currency, in order of first appearance
    pub totals_due: Vec<Money>,
    pub locale: Locale,
}

/// Severity of a [`Notification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
}

/// Non-blocking outcome reported back to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Sums amounts per currency, keeping the order in which currencies appear
fn totals_by_currency<'a, I>(amounts: I) -> Result<Vec<Money>, BillingError>
where
    I: IntoIterator<Item = &'a Money>,
{
    let mut totals: Vec<Money> = Vec::new();
    for amount in amounts {
        match totals.iter_mut().find(|t| t.currency() == amount.currency()) {
            Some(total) => *total = total.checked_add(amount)?,
            None => totals.push(*amount),
        }
    }
    Ok(totals)
}

/// Builds the reminder for the overdue invoices among `balances`
pub fn build_reminder(
    client: &Client,
    balances: &[InvoiceBalance],
    channel: ReminderChannel,
    today: NaiveDate,
    locale: Locale,
) -> Result<Reminder, BillingError> {
    let recipient = recipient_for(client, channel)?;

    let mut overdue: Vec<&InvoiceBalance> = balances
        .iter()
        .filter(|b| b.client_id == client.id && b.overdue)
        .collect();
    if overdue.is_empty() {
        return Err(BillingError::NoOverdueInvoices);
    }
    overdue.sort_by_key(|b| b.date_echeance);

    let totals_due = totals_by_currency(overdue.iter().map(|b| &b.montant_restant))?;
    let lines: Vec<ReminderLine> = overdue
        .iter()
        .map(|b| ReminderLine {
            numero: b.numero.clone(),
            date_echeance: b.date_echeance,
            montant_restant: b.montant_restant,
            days_overdue: (today - b.date_echeance).num_days(),
        })
        .collect();

    let renderer = Renderer::new(locale)?;
    let mut args = FluentArgs::new();
    args.set("count", lines.len().to_string());
    let subject = renderer.render("reminder-subject", Some(&args))?;

    let mut body = Vec::with_capacity(lines.len() + 4);
    let mut args = FluentArgs::new();
    args.set("nom", client.nom.clone());
    body.push(renderer.render("reminder-greeting", Some(&args))?);
    body.push(renderer.render("reminder-intro", None)?);
    for line in &lines {
        let mut args = FluentArgs::new();
        args.set("numero", line.numero.clone());
        args.set("echeance", line.date_echeance.format(date_format(locale)).to_string());
        args.set("days", line.days_overdue.to_string());
        args.set("restant", line.montant_restant.to_string());
        body.push(renderer.render("reminder-line", Some(&args))?);
    }
    for total in &totals_due {
        let mut args = FluentArgs::new();
        args.set("total", total.to_string());
        body.push(renderer.render("reminder-total", Some(&args))?);
    }
    body.push(renderer.render("reminder-closing", None)?);

    Ok(Reminder {
        client_id: client.id,
        channel,
        recipient,
        subject,
        body: body.join("\n"),
        lines,
        totals_due,
        locale,
    })
}

/// Sends `reminder` and turns the outcome into a notification
///
/// A delivery failure is logged and reported, never retried.
pub async fn dispatch_reminder(gateway: &dyn ReminderGateway, reminder: &Reminder) -> Notification {
    match gateway.send_reminder(reminder).await {
        Ok(()) => {
            tracing::info!(
                client_id = %reminder.client_id,
                channel = %reminder.channel,
                invoices = reminder.lines.len(),
                "reminder sent"
            );
            Notification {
                level: NotificationLevel::Info,
                message: format!("Reminder sent to {}", reminder.recipient),
            }
        }
        Err(err) => {
            tracing::warn!(
                client_id = %reminder.client_id,
                channel = %reminder.channel,
                error = %err,
                "reminder delivery failed"
            );
            Notification {
                level: NotificationLevel::Warning,
                message: format!("Reminder could not be sent: {}", err),
            }
        }
    }
}

fn recipient_for(client: &Client, channel: ReminderChannel) -> Result<String, BillingError> {
    let address = match channel {
        ReminderChannel::Email => client.email.as_deref(),
        ReminderChannel::Sms => client.telephone.as_deref(),
    };
    address
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BillingError::MissingRecipient(channel.to_string()))
}

fn date_format(locale: Locale) -> &'static str {
    match locale {
        Locale::Fr => "%d/%m/%Y",
        Locale::En => "%Y-%m-%d",
    }
}

/// Fluent bundle for one locale; bundles are not `Sync`, so one is built per reminder
struct Renderer {
    bundle: FluentBundle<FluentResource>,
}

impl Renderer {
    fn new(locale: Locale) -> Result<Self, BillingError> {
        let resource = FluentResource::try_new(locale.source().to_string())
            .map_err(|(_, errors)| BillingError::Template(format!("{:?}", errors)))?;
        let mut bundle = FluentBundle::new(vec![locale.language()]);
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| BillingError::Template(format!("{:?}", errors)))?;
        Ok(Self { bundle })
    }

    fn render(&self, id: &str, args: Option<&FluentArgs>) -> Result<String, BillingError> {
        let pattern = self
            .bundle
            .get_message(id)
            .and_then(|m| m.value())
            .ok_or_else(|| BillingError::Template(format!("missing message {}", id)))?;
        let mut errors = Vec::new();
        let text = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            return Err(BillingError::Template(format!("{}: {:?}", id, errors)));
        }
        Ok(text.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{Invoice, InvoiceStatus};
    use crate::reconciliation::reconcile;
    use core_kernel::{CabinetId, Currency};
    use domain_client::{ClientType, FiscalRegime};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client() -> Client {
        Client::new(CabinetId::new(), "Ets Fotso", ClientType::Morale, FiscalRegime::Reel)
            .with_email("compta@fotso.cm")
    }

    fn overdue_balance(client: &Client, numero: &str, montant: i64) -> InvoiceBalance {
        let invoice = Invoice::new(client.id, date(2024, 1, 1), date(2024, 1, 31), Money::xaf(montant.into()))
            .with_numero(numero);
        reconcile(&invoice, &[], date(2024, 2, 10)).unwrap()
    }

    #[test]
    fn test_french_reminder_lists_overdue_invoices() {
        let c = client();
        let balances = vec![overdue_balance(&c, "FAC-1", 50000), overdue_balance(&c, "FAC-2", 25000)];

        let reminder = build_reminder(&c, &balances, ReminderChannel::Email, date(2024, 2, 10), Locale::Fr).unwrap();

        assert_eq!(reminder.recipient, "compta@fotso.cm");
        assert_eq!(reminder.totals_due, vec![Money::xaf(dec!(75000))]);
        assert_eq!(reminder.subject, "Relance : 2 facture(s) en retard");
        assert!(reminder.body.starts_with("Bonjour Ets Fotso,"));
        assert!(reminder.body.contains("FAC-1 échue le 31/01/2024 (10 jour(s) de retard) : 50000 FCFA"));
        assert!(reminder.body.contains("Total dû : 75000 FCFA"));
    }

    #[test]
    fn test_mixed_currencies_get_one_total_each() {
        let c = client();
        let euro = Invoice::new(c.id, date(2024, 1, 10), date(2024, 1, 20), Money::new(dec!(150), Currency::EUR))
            .with_numero("FAC-EUR");
        let balances = vec![
            overdue_balance(&c, "FAC-1", 50000),
            reconcile(&euro, &[], date(2024, 2, 10)).unwrap(),
            overdue_balance(&c, "FAC-2", 25000),
        ];

        let reminder = build_reminder(&c, &balances, ReminderChannel::Email, date(2024, 2, 10), Locale::Fr).unwrap();

        assert_eq!(reminder.lines.len(), 3);
        assert_eq!(
            reminder.totals_due,
            vec![Money::new(dec!(150), Currency::EUR), Money::xaf(dec!(75000))]
        );
        assert!(reminder.body.contains("Total dû : € 150.00"));
        assert!(reminder.body.contains("Total dû : 75000 FCFA"));
    }

    #[test]
    fn test_english_reminder() {
        let c = client();
        let balances = vec![overdue_balance(&c, "FAC-9", 1000)];
        let reminder = build_reminder(&c, &balances, ReminderChannel::Email, date(2024, 2, 10), Locale::En).unwrap();
        assert_eq!(reminder.subject, "Reminder: 1 overdue invoice(s)");
        assert!(reminder.body.contains("FAC-9 due on 2024-01-31"));
    }

    #[test]
    fn test_no_overdue_invoice() {
        let c = client();
        let mut balance = overdue_balance(&c, "FAC-1", 1000);
        balance.overdue = false;
        balance.status = InvoiceStatus::Payee;
        let err = build_reminder(&c, &[balance], ReminderChannel::Email, date(2024, 2, 10), Locale::Fr).unwrap_err();
        assert!(matches!(err, BillingError::NoOverdueInvoices));
    }

    #[test]
    fn test_missing_phone_for_sms() {
        let c = client();
        let balances = vec![overdue_balance(&c, "FAC-1", 1000)];
        let err = build_reminder(&c, &balances, ReminderChannel::Sms, date(2024, 2, 10), Locale::Fr).unwrap_err();
        assert!(matches!(err, BillingError::MissingRecipient(ref c) if c == "sms"));
    }
}
