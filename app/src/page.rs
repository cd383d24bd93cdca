use patternfly_yew::prelude::*;
use yew::prelude::*;

#[derive(Clone, Debug, Properties, PartialEq)]
pub struct PageProps {
    pub title: AttrValue,
    /// Shown under the title.
    #[prop_or_default]
    pub description: Option<AttrValue>,
    #[prop_or_default]
    pub children: Children,
}

#[function_component(Page)]
pub fn page(props: &PageProps) -> Html {
    let description = props
        .description
        .clone()
        .map(|description| html!(<p>{ description }</p>));

    html! (
        <PageSectionGroup>
            <PageSection variant={PageSectionVariant::Light} limit_width=true>
                <Content>
                    <Title size={Size::XXLarge}>{ props.title.clone() }</Title>
                    { for description }
                </Content>
            </PageSection>
            if !props.children.is_empty() {
                <PageSection>{ for props.children.iter() }</PageSection>
            }
        </PageSectionGroup>
    )
}
