//! Search authorisation. Passing the flow only proves who the user is;
//! whether their binds may be followed by searches is decided by group
//! membership against the configured allow list.

use std::collections::BTreeSet;

use uuid::Uuid;

use flowbind_proto::v1::FlowUser;

/// True iff any of the identity's groups is in the allowed set. An empty
/// allow list means nobody may search.
pub fn has_search_access(user: &FlowUser, allowed_groups: &BTreeSet<Uuid>) -> bool {
    for group in &user.groups {
        trace!(user_group = %group.pk, "checking search access");
        if allowed_groups.contains(&group.pk) {
            info!(group = %group.name, "allowed access to search");
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::test_user;

    fn group_set(groups: &[Uuid]) -> BTreeSet<Uuid> {
        groups.iter().copied().collect()
    }

    #[test]
    fn test_has_search_access_intersecting() {
        let allowed = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = test_user(&[other, allowed]);
        assert!(has_search_access(&user, &group_set(&[allowed])));
    }

    #[test]
    fn test_has_search_access_disjoint() {
        let user = test_user(&[Uuid::new_v4()]);
        assert!(!has_search_access(&user, &group_set(&[Uuid::new_v4()])));
    }

    #[test]
    fn test_has_search_access_empty_allow_list() {
        let user = test_user(&[Uuid::new_v4()]);
        assert!(!has_search_access(&user, &BTreeSet::new()));
    }

    #[test]
    fn test_has_search_access_no_groups() {
        let user = test_user(&[]);
        assert!(!has_search_access(&user, &group_set(&[Uuid::new_v4()])));
    }
}
