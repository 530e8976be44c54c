//! This file defines the templates and a convenience function for creating the navigation bar.

use maud::{Markup, html};

use crate::endpoints;

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to
/// `true`. Only one link should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!( a href=(self.url) class=(style) { (self.title) } )
    }
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Get the navigation bar.
    ///
    /// If a link matches `active_endpoint`, then that link will be
    /// marked as active and displayed differently in the HTML.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let links = vec![
            Link {
                url: endpoints::DASHBOARD_VIEW,
                title: "Dashboard",
                is_current: active_endpoint == endpoints::DASHBOARD_VIEW,
            },
            Link {
                url: endpoints::TRANSACTIONS_VIEW,
                title: "Transactions",
                is_current: active_endpoint == endpoints::TRANSACTIONS_VIEW,
            },
            Link {
                url: endpoints::CATEGORIES_VIEW,
                title: "Categories",
                is_current: active_endpoint == endpoints::CATEGORIES_VIEW,
            },
            Link {
                url: endpoints::BUDGETS_VIEW,
                title: "Budgets",
                is_current: active_endpoint == endpoints::BUDGETS_VIEW,
            },
        ];

        NavBar { links }
    }

    pub fn into_html(self) -> Markup {
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href="/"
                        class="flex items-center space-x-3 rtl:space-x-reverse"
                    {
                        span
                            class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Centsible"
                        }
                    }

                    div class="flex items-center gap-6"
                    {
                        ul
                            class="font-medium flex flex-row space-x-6 lg:space-x-8
                            rtl:space-x-reverse text-gray-900 dark:text-white"
                        {
                            @for link in self.links.into_iter() {
                                li { (link.into_html()) }
                            }
                        }

                        (theme_toggle_button())
                    }
                }
            }
        )
    }
}

/// The dark-mode toggle. `theme.js` wires up the click handler and keeps the
/// choice in localStorage.
fn theme_toggle_button() -> Markup {
    html!(
        button
            type="button"
            id="theme-toggle"
            aria-label="Toggle dark mode"
            class="rounded-lg p-2 text-gray-500 hover:bg-gray-100 hover:text-gray-900
                dark:text-gray-400 dark:hover:bg-gray-700 dark:hover:text-white"
        {
            span class="dark:hidden" { "🌙" }
            span class="hidden dark:inline" { "☀\u{fe0f}" }
        }
    )
}
