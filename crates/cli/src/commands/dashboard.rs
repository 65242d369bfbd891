use std::sync::Arc;

use procure_client::{Feed, FeedClosed, ProcurementApi, RefreshHub, Snapshot};
use procure_core::config::LoadOptions;
use procure_core::dashboard::{
    AdminView, ApproverMode, ApproverView, Dashboard, FeedKind, FinanceTab, PaymentView,
    RequestFilter, RequesterView,
};
use procure_core::domain::approval::PendingApproval;
use procure_core::domain::directory::{Directory, User, UserId};
use procure_core::domain::payment::Payment;
use procure_core::domain::request::PurchaseRequest;
use tracing::info;

use crate::commands::{render, resolve_user, CommandResult, Session};

const COMMAND: &str = "dashboard";

#[derive(Clone, Debug, Default)]
pub struct DashboardArgs {
    pub user: Option<UserId>,
    pub once: bool,
    pub tab: Option<FinanceTab>,
    pub history: bool,
    pub filter: RequestFilter,
}

pub fn run(options: LoadOptions, args: DashboardArgs) -> CommandResult {
    let session = match Session::open(COMMAND, options) {
        Ok(session) => session,
        Err(result) => return result,
    };
    let user_id = match session.acting_user(COMMAND, args.user) {
        Ok(user_id) => user_id,
        Err(result) => return result,
    };

    let api = Arc::clone(&session.api);
    let polling = session.config.polling;
    session.block_on(async move {
        let hub = Arc::new(RefreshHub::new(api, polling));
        if args.once {
            return render_once(&hub, user_id, &args).await;
        }
        watch(&hub, user_id, &args).await
    })
}

/// Renders the dashboard from the first completed fetch of every feed it needs.
pub async fn render_once(hub: &RefreshHub, user_id: UserId, args: &DashboardArgs) -> CommandResult {
    let (dashboard, user) = match select(hub.api().as_ref(), user_id, args).await {
        Ok(selected) => selected,
        Err(result) => return result,
    };
    let mut feeds = DashboardFeeds::subscribe(hub, &dashboard, user.id);
    if feeds.first().await.is_err() {
        return CommandResult::failure(COMMAND, "feed_closed", "dashboard feeds stopped", 1);
    }
    CommandResult::text(feeds.render(&dashboard, &user, args))
}

async fn watch(hub: &RefreshHub, user_id: UserId, args: &DashboardArgs) -> CommandResult {
    let (dashboard, user) = match select(hub.api().as_ref(), user_id, args).await {
        Ok(selected) => selected,
        Err(result) => return result,
    };
    if !dashboard.is_supported() {
        return CommandResult::text(unsupported(&dashboard));
    }

    info!(
        event_name = "cli.dashboard.opened",
        user_id = %user.id,
        dashboard = %dashboard.title(),
        "dashboard opened"
    );
    let mut feeds = DashboardFeeds::subscribe(hub, &dashboard, user.id);
    loop {
        println!("{}\n", feeds.render(&dashboard, &user, args));
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = feeds.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    info!(event_name = "cli.dashboard.closed", user_id = %user.id, "dashboard closed");
    CommandResult::text(String::new())
}

async fn select(
    api: &dyn ProcurementApi,
    user_id: UserId,
    args: &DashboardArgs,
) -> Result<(Dashboard, User), CommandResult> {
    let user = resolve_user(api, COMMAND, user_id).await?;
    let dashboard = Dashboard::for_role(user.role).with_tab(args.tab.unwrap_or_default());
    Ok((dashboard, user))
}

fn unsupported(dashboard: &Dashboard) -> String {
    format!("{}: no dashboard is available for this role.", dashboard.title())
}

/// The subset of feeds one dashboard variant reads.
struct DashboardFeeds {
    reference: Option<Feed<Directory>>,
    requests: Option<Feed<Vec<PurchaseRequest>>>,
    pending: Option<Feed<Vec<PendingApproval>>>,
    payments: Option<Feed<Vec<Payment>>>,
}

impl DashboardFeeds {
    fn subscribe(hub: &RefreshHub, dashboard: &Dashboard, user: UserId) -> Self {
        let kinds = dashboard.feeds();
        let wants = |kind: FeedKind| kinds.contains(&kind);
        Self {
            reference: wants(FeedKind::Reference).then(|| hub.reference()),
            requests: wants(FeedKind::Requests).then(|| hub.requests()),
            pending: wants(FeedKind::PendingApprovals).then(|| hub.pending_approvals(user)),
            payments: wants(FeedKind::Payments).then(|| hub.payments()),
        }
    }

    async fn first(&mut self) -> Result<(), FeedClosed> {
        wait_first(&mut self.reference).await?;
        wait_first(&mut self.requests).await?;
        wait_first(&mut self.pending).await?;
        wait_first(&mut self.payments).await?;
        Ok(())
    }

    async fn changed(&mut self) -> Result<(), FeedClosed> {
        tokio::select! {
            result = wait_changed(&mut self.reference) => result,
            result = wait_changed(&mut self.requests) => result,
            result = wait_changed(&mut self.pending) => result,
            result = wait_changed(&mut self.payments) => result,
        }
    }

    fn render(&self, dashboard: &Dashboard, user: &User, args: &DashboardArgs) -> String {
        let requests = snapshot(&self.requests);
        let pending = snapshot(&self.pending);
        let payments = snapshot(&self.payments);
        let reference = snapshot(&self.reference);

        let mut notices = Vec::new();
        push_notice(&mut notices, "requests", &requests);
        push_notice(&mut notices, "pending approvals", &pending);
        push_notice(&mut notices, "payments", &payments);
        push_notice(&mut notices, "reference data", &reference);

        let requests = values(&requests);
        let pending = values(&pending);
        let payments = values(&payments);

        let body = match dashboard {
            Dashboard::Requester => {
                let vendors = reference
                    .and_then(|snapshot| snapshot.value)
                    .map(|directory| directory.vendors)
                    .unwrap_or_default();
                render::requester(&RequesterView::project(user, &requests), &vendors)
            }
            Dashboard::Approver { .. } | Dashboard::Finance { tab: FinanceTab::Approvals } => {
                let mode = if args.history { ApproverMode::History } else { ApproverMode::Pending };
                let view = ApproverView::project(user, &pending, &requests, mode);
                render::approver(&dashboard.title(), &view)
            }
            Dashboard::Finance { tab: FinanceTab::Payments } => {
                render::payments(&PaymentView::project(&payments))
            }
            Dashboard::Admin => {
                render::admin(&AdminView::project(&requests, &payments, args.filter))
            }
            Dashboard::Unsupported { .. } => unsupported(dashboard),
        };

        if notices.is_empty() {
            body
        } else {
            format!("{}\n{body}", notices.join("\n"))
        }
    }
}

fn snapshot<T: Clone>(feed: &Option<Feed<T>>) -> Option<Snapshot<T>> {
    feed.as_ref().map(Feed::snapshot)
}

fn values<T: Clone>(snapshot: &Option<Snapshot<Vec<T>>>) -> Vec<T> {
    snapshot.as_ref().and_then(|snapshot| snapshot.value.clone()).unwrap_or_default()
}

fn push_notice<T>(notices: &mut Vec<String>, label: &str, snapshot: &Option<Snapshot<T>>) {
    if let Some(text) = snapshot.as_ref().and_then(|snapshot| render::feed_notice(label, snapshot)) {
        notices.push(text);
    }
}

async fn wait_first<T: Clone>(feed: &mut Option<Feed<T>>) -> Result<(), FeedClosed> {
    match feed {
        Some(feed) => feed.first().await.map(|_| ()),
        None => Ok(()),
    }
}

async fn wait_changed<T: Clone>(feed: &mut Option<Feed<T>>) -> Result<(), FeedClosed> {
    match feed {
        Some(feed) => feed.changed().await.map(|_| ()),
        None => std::future::pending().await,
    }
}
