use yew_router::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Routable)]
pub enum Route {
    #[at("/")]
    Root,
    #[at("/cointable")]
    CoinTable,
    #[at("/performancetracker")]
    PerformanceTracker,
}

/// The views a route can end up rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    CoinTable,
    PerformanceTracker,
}

impl Route {
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Route::Root => Some(Route::CoinTable),
            Route::CoinTable | Route::PerformanceTracker => None,
        }
    }

    pub fn view(&self) -> View {
        match (self, self.redirect()) {
            (_, Some(target)) => target.view(),
            (Route::PerformanceTracker, None) => View::PerformanceTracker,
            (Route::CoinTable | Route::Root, None) => View::CoinTable,
        }
    }
}

pub fn resolve(path: &str) -> Option<View> {
    Route::recognize(path).map(|route| route.view())
}

/// `#/cointable` -> `/cointable`; an empty fragment is the root.
pub fn path_from_hash(hash: &str) -> &str {
    match hash.trim_start_matches('#') {
        "" => "/",
        path => path,
    }
}
