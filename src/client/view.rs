//! The state behind the accounts list screen.
//!
//! The view owns the format toggle and the rows currently shown. It does not
//! draw anything: front ends read [ComptesView::rows] and show the
//! [Notification]s returned by the actions.

use std::fmt::Display;

use crate::{
    Compte, CompteId, Format,
    client::{ClientError, CompteClient, RequestConfig},
};

/// Permission to apply the result of one `list` request.
///
/// Tickets are numbered in the order they are handed out, so a result that
/// arrives after a newer one has been applied can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
    /// The config the `list` request must be sent with.
    pub config: RequestConfig,
}

/// What a refresh did to the rows.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The rows were replaced by this many accounts.
    Applied(usize),
    /// A newer refresh had already been applied, so this result was dropped.
    Stale,
    /// The request failed and the rows were left as they were.
    Failed(ClientError),
}

/// A short message for the user after an update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The account was updated.
    Updated,
    /// The update failed, for whatever reason.
    UpdateFailed,
    /// The account was deleted.
    Deleted,
    /// The delete failed, for whatever reason.
    DeleteFailed,
}

impl Notification {
    /// Whether the notification reports a failure.
    pub fn is_error(self) -> bool {
        matches!(self, Notification::UpdateFailed | Notification::DeleteFailed)
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Notification::Updated => "Account updated",
            Notification::UpdateFailed => "Could not update the account",
            Notification::Deleted => "Account deleted",
            Notification::DeleteFailed => "Could not delete the account",
        };

        f.write_str(message)
    }
}

/// The result of an update or delete.
#[derive(Debug)]
pub struct ActionOutcome {
    /// The message to show the user.
    pub notification: Notification,
    /// The refresh that followed a successful action, `None` after a failure.
    pub refresh: Option<RefreshOutcome>,
}

/// The accounts list screen: a format toggle and the rows last fetched with it.
#[derive(Debug, Default)]
pub struct ComptesView {
    config: RequestConfig,
    rows: Vec<Compte>,
    issued: u64,
    applied: u64,
}

impl ComptesView {
    /// An empty view that will fetch with `config`.
    pub fn new(config: RequestConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The rows currently shown, in the order the server returned them.
    pub fn rows(&self) -> &[Compte] {
        &self.rows
    }

    /// The shown row for account `id`, e.g. to pre-fill an edit form.
    pub fn row(&self, id: CompteId) -> Option<&Compte> {
        self.rows.iter().find(|compte| compte.id == id)
    }

    /// The selected wire format.
    pub fn format(&self) -> Format {
        self.config.format
    }

    /// Select the wire format used from the next request on.
    ///
    /// The rows are not fetched again, call [ComptesView::refresh] for that.
    pub fn set_format(&mut self, format: Format) {
        tracing::debug!("Selected format {}", format.mime());
        self.config.format = format;
    }

    /// The config for the next request.
    pub fn request_config(&self) -> RequestConfig {
        self.config
    }

    /// Hand out a ticket for a new `list` request.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;

        RefreshTicket {
            generation: self.issued,
            config: self.config,
        }
    }

    /// Apply the result of the `list` request made for `ticket`.
    ///
    /// Results for tickets older than the last one applied are dropped. A
    /// failure counts as applied, so older in-flight results cannot overwrite
    /// the rows after it.
    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Compte>, ClientError>,
    ) -> RefreshOutcome {
        if ticket.generation <= self.applied {
            tracing::debug!(
                "Dropping refresh {} as refresh {} is already applied",
                ticket.generation,
                self.applied
            );
            return RefreshOutcome::Stale;
        }

        self.applied = ticket.generation;

        match result {
            Ok(comptes) => {
                self.rows = comptes;
                RefreshOutcome::Applied(self.rows.len())
            }
            Err(error) => {
                tracing::warn!("Could not fetch accounts: {error}");
                RefreshOutcome::Failed(error)
            }
        }
    }

    /// Fetch every account and show them.
    pub async fn refresh(&mut self, client: &CompteClient) -> RefreshOutcome {
        let ticket = self.begin_refresh();
        let result = client.list(&ticket.config).await;

        self.apply_refresh(ticket, result)
    }

    /// Replace the account `id` with `compte`, then refresh on success.
    ///
    /// Failures are not retried.
    pub async fn update(
        &mut self,
        client: &CompteClient,
        id: CompteId,
        compte: &Compte,
    ) -> ActionOutcome {
        let config = self.config;

        match client.update(&config, id, compte).await {
            Ok(_) => ActionOutcome {
                notification: Notification::Updated,
                refresh: Some(self.refresh(client).await),
            },
            Err(error) => {
                tracing::warn!("Could not update account {id}: {error}");
                ActionOutcome {
                    notification: Notification::UpdateFailed,
                    refresh: None,
                }
            }
        }
    }

    /// Delete the account `id`, then refresh on success.
    ///
    /// Failures are not retried.
    pub async fn delete(&mut self, client: &CompteClient, id: CompteId) -> ActionOutcome {
        let config = self.config;

        match client.delete(&config, id).await {
            Ok(()) => ActionOutcome {
                notification: Notification::Deleted,
                refresh: Some(self.refresh(client).await),
            },
            Err(error) => {
                tracing::warn!("Could not delete account {id}: {error}");
                ActionOutcome {
                    notification: Notification::DeleteFailed,
                    refresh: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Compte, Format, TypeCompte,
        client::{ClientError, CompteClient, RequestConfig},
        test_utils::{must_insert_compte, spawn_app},
    };

    use super::{ComptesView, Notification, RefreshOutcome};

    fn compte(id: i64, solde: f64) -> Compte {
        Compte {
            id,
            solde,
            date_creation: date!(2024 - 01 - 01),
            type_compte: TypeCompte::Epargne,
        }
    }

    #[tokio::test]
    async fn update_then_delete_refreshes_rows() {
        let (client, state) = spawn_app().await;
        let initial = must_insert_compte(&state, 500.0, date!(2024 - 01 - 01), TypeCompte::Epargne);
        let mut view = ComptesView::default();

        assert!(matches!(
            view.refresh(&client).await,
            RefreshOutcome::Applied(1)
        ));
        assert_eq!(view.rows(), [initial.clone()]);

        let want = compte(initial.id, 600.0);
        let outcome = view.update(&client, initial.id, &want).await;

        assert_eq!(outcome.notification, Notification::Updated);
        assert!(matches!(outcome.refresh, Some(RefreshOutcome::Applied(1))));
        assert_eq!(view.rows(), [want]);

        let outcome = view.delete(&client, initial.id).await;

        assert_eq!(outcome.notification, Notification::Deleted);
        assert!(matches!(outcome.refresh, Some(RefreshOutcome::Applied(0))));
        assert!(view.rows().is_empty());
    }

    #[tokio::test]
    async fn toggling_format_fetches_identical_rows() {
        let (client, state) = spawn_app().await;
        must_insert_compte(&state, 1.5, date!(2023 - 03 - 03), TypeCompte::Courant);
        must_insert_compte(&state, 2.5, date!(2023 - 04 - 04), TypeCompte::Epargne);
        let mut view = ComptesView::new(RequestConfig::new(Format::Json));
        view.refresh(&client).await;
        let json_rows = view.rows().to_vec();

        view.set_format(Format::Xml);
        let outcome = view.refresh(&client).await;

        assert_eq!(view.format(), Format::Xml);
        assert!(matches!(outcome, RefreshOutcome::Applied(2)));
        assert_eq!(view.rows(), json_rows);
    }

    #[tokio::test]
    async fn failed_actions_leave_rows_unchanged() {
        let (client, state) = spawn_app().await;
        let initial = must_insert_compte(&state, 500.0, date!(2024 - 01 - 01), TypeCompte::Epargne);
        let mut view = ComptesView::default();
        view.refresh(&client).await;

        let update = view.update(&client, 99, &compte(99, 1.0)).await;
        let delete = view.delete(&client, 99).await;

        assert_eq!(update.notification, Notification::UpdateFailed);
        assert!(update.refresh.is_none());
        assert_eq!(delete.notification, Notification::DeleteFailed);
        assert!(delete.notification.is_error());
        assert_eq!(view.rows(), [initial]);
    }

    #[tokio::test]
    async fn failed_refresh_is_reported_and_keeps_rows() {
        let (client, state) = spawn_app().await;
        let initial = must_insert_compte(&state, 500.0, date!(2024 - 01 - 01), TypeCompte::Epargne);
        let mut view = ComptesView::default();
        view.refresh(&client).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let offline = CompteClient::new(&format!("http://{addr}/")).unwrap();

        let outcome = view.refresh(&offline).await;

        assert!(matches!(
            outcome,
            RefreshOutcome::Failed(ClientError::Transport(_))
        ));
        assert_eq!(view.rows(), [initial]);
    }

    #[test]
    fn results_are_applied_in_request_order() {
        let mut view = ComptesView::default();
        let older = view.begin_refresh();
        let newer = view.begin_refresh();

        let newer_outcome = view.apply_refresh(newer, Ok(vec![compte(1, 2.0)]));
        let older_outcome = view.apply_refresh(older, Ok(vec![compte(1, 1.0)]));

        assert!(matches!(newer_outcome, RefreshOutcome::Applied(1)));
        assert!(matches!(older_outcome, RefreshOutcome::Stale));
        assert_eq!(view.rows(), [compte(1, 2.0)]);
    }

    #[test]
    fn failed_newer_refresh_blocks_older_results() {
        let mut view = ComptesView::default();
        let older = view.begin_refresh();
        let newer = view.begin_refresh();

        let newer_outcome = view.apply_refresh(newer, Err(ClientError::EmptyBody));
        let older_outcome = view.apply_refresh(older, Ok(vec![compte(1, 1.0)]));

        assert!(matches!(
            newer_outcome,
            RefreshOutcome::Failed(ClientError::EmptyBody)
        ));
        assert!(matches!(older_outcome, RefreshOutcome::Stale));
        assert!(view.rows().is_empty());
    }

    #[test]
    fn ticket_keeps_format_selected_when_issued() {
        let mut view = ComptesView::default();
        let ticket = view.begin_refresh();

        view.set_format(Format::Xml);

        assert_eq!(ticket.config.format, Format::Json);
        assert_eq!(view.request_config().format, Format::Xml);
    }
}
