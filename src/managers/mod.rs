// TabSync state managers
// Managers handle local stateful operations: the tab model and the device identity.

pub mod identity_manager;
pub mod tab_manager;
