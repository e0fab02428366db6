// src/route.rs

/// Places the client can send the user after an action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    PayrollList,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::PayrollList => "/payroll",
        }
    }
}
