use qrdine_application::{AccessDeniedNotice, AccessGuard, AuthorizationContext, GuardView};
use qrdine_core::UserId;
use qrdine_domain::AuthorizationSnapshot;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AuthorizationReport {
    pub user_id: Option<UserId>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub snapshot: AuthorizationSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardReport>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardReport {
    Loading,
    Granted { unconditional: bool },
    AccessDenied { notice: AccessDeniedNotice },
    Hidden,
}

impl AuthorizationReport {
    pub fn build(context: &AuthorizationContext, guard: Option<&AccessGuard>) -> Self {
        let state = context.state();

        Self {
            user_id: state.user_id,
            loading: state.loading,
            last_error: state.last_error,
            is_admin: context.is_admin(),
            is_super_admin: context.is_super_admin(),
            snapshot: state.snapshot,
            guard: guard.map(|guard| guard_report(context, guard)),
        }
    }
}

fn guard_report(context: &AuthorizationContext, guard: &AccessGuard) -> GuardReport {
    match guard.render(context, || ()) {
        GuardView::Loading => GuardReport::Loading,
        GuardView::Granted(()) | GuardView::Fallback(()) => GuardReport::Granted {
            unconditional: guard.is_unconditional(),
        },
        GuardView::AccessDenied(notice) => GuardReport::AccessDenied { notice },
        GuardView::Hidden => GuardReport::Hidden,
    }
}
