pub mod handle;

use stars_shared::account::{perm, role};

use crate::auth::{gate, Principal};
use crate::Error;

/// Reports are admin territory, but the `report:students` permission
/// opens them to other roles without a hard role gate.
fn check_report_access(principal: &Principal) -> Result<(), Error> {
    if principal.role_name.eq_ignore_ascii_case(role::ADMIN)
        || gate::has_permission(principal, perm::REPORT_STUDENTS)
    {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "reports require the admin role or report permission",
        ))
    }
}
