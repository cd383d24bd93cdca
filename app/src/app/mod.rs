use crate::routes::{Route, View};
use crate::views::{CoinTable, PerformanceTracker};
use patternfly_yew::prelude::{MastheadBrand, Nav, NavList, Page, PageSidebar};
use yew::prelude::*;
use yew_router::prelude::{use_route, HashRouter, Link, Redirect, Switch as RouterSwitch};

#[function_component(Application)]
pub fn app() -> Html {
    html! {
        <HashRouter>
            <AppPage>
                <RouterSwitch<Route> render={switch_app_route} />
            </AppPage>
        </HashRouter>
    }
}

pub(crate) fn switch_app_route(target: Route) -> Html {
    if let Some(to) = target.redirect() {
        return html! { <Redirect<Route> {to} /> };
    }
    match target.view() {
        View::CoinTable => html! {<CoinTable/>},
        View::PerformanceTracker => html! {<PerformanceTracker/>},
    }
}

#[derive(Clone, Debug, PartialEq, Properties)]
pub struct PageProps {
    pub children: Children,
}

#[function_component(AppPage)]
fn page(props: &PageProps) -> Html {
    let sidebar = html_nested! {
        <PageSidebar>
                <Nav>
                    <NavList>
                        <NavRouteItem to={Route::CoinTable}>{"Coin Table"}</NavRouteItem>
                        <NavRouteItem to={Route::PerformanceTracker}>{"Performance Tracker"}</NavRouteItem>
                    </NavList>
                </Nav>
        </PageSidebar>
    };

    let brand = html! (
        <MastheadBrand>
            <h1>{"Crypto Opportunity"}</h1>
        </MastheadBrand>
    );

    html! (
        <Page {brand} {sidebar} >
            { for props.children.iter() }
        </Page>
    )
}

#[derive(Clone, Debug, PartialEq, Properties)]
struct NavRouteItemProps {
    to: Route,
    children: Children,
}

/// Hash-router counterpart of patternfly's `NavRouterItem`.
#[function_component(NavRouteItem)]
fn nav_route_item(props: &NavRouteItemProps) -> Html {
    let mut classes = Classes::from("pf-v5-c-nav__link");
    if use_route::<Route>().map(|route| route.view()) == Some(props.to.view()) {
        classes.push("pf-m-current");
    }

    html! {
        <li class="pf-v5-c-nav__item">
            <Link<Route> {classes} to={props.to}>
                { for props.children.iter() }
            </Link<Route>>
        </li>
    }
}
