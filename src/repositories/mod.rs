pub(crate) mod analytics;
pub(crate) mod assignments;
pub(crate) mod groups;
pub(crate) mod invitations;
pub(crate) mod submissions;
pub(crate) mod users;
