use crate::page::Page;
use yew::prelude::*;

#[function_component(CoinTable)]
pub fn coin_table() -> Html {
    html!(
        <Page title="Coin Table" description="Coins tracked by the service." />
    )
}
