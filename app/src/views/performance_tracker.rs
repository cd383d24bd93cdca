use crate::page::Page;
use yew::prelude::*;

#[function_component(PerformanceTracker)]
pub fn performance_tracker() -> Html {
    html!(
        <Page
            title="Performance Tracker"
            description="Forecast accuracy per coin."
        />
    )
}
