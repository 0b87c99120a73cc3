//! Subscriber e-mail templates.
//!
//! Templates are compiled into the binary and rendered with tera. HTML
//! variants are auto-escaped; text variants are not.

use crate::{Email, EmailError};
use chrono::Datelike;
use serde::Serialize;
use tera::{Context, Tera};
use url::Url;

const TEMPLATES: [(&str, &str); 5] = [
    ("layout.html", include_str!("../templates/layout.html")),
    ("welcome.html", include_str!("../templates/welcome.html")),
    ("welcome.txt", include_str!("../templates/welcome.txt")),
    ("featured_post.html", include_str!("../templates/featured_post.html")),
    ("featured_post.txt", include_str!("../templates/featured_post.txt")),
];

#[derive(Debug, Clone, Serialize)]
pub struct SiteInfo {
    pub name: String,
    /// Public base URL, e.g. `https://blog.example.com`
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturedPost {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
}

pub struct EmailTemplates {
    tera: Tera,
    site: SiteInfo,
    base_url: Url,
    from: String,
}

impl EmailTemplates {
    pub fn new(site: SiteInfo, from: impl Into<String>) -> Result<Self, EmailError> {
        let base_url = Url::parse(&site.url).map_err(|e| {
            EmailError::configuration(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;

        Ok(Self {
            tera,
            site,
            base_url,
            from: from.into(),
        })
    }

    pub fn site(&self) -> &SiteInfo {
        &self.site
    }

    pub fn welcome(&self, to: &str) -> Result<Email, EmailError> {
        let context = self.base_context(to)?;
        self.compose(
            to,
            format!("Welcome to {} - Thank You for Subscribing!", self.site.name),
            "welcome",
            &context,
        )
    }

    pub fn featured_post(&self, to: &str, post: &FeaturedPost) -> Result<Email, EmailError> {
        let mut context = self.base_context(to)?;
        context.insert("post", post);
        context.insert("post_url", self.link(&format!("blog/{}", post.slug))?.as_str());
        self.compose(
            to,
            format!("{} | New on {}", post.title, self.site.name),
            "featured_post",
            &context,
        )
    }

    /// Unsubscribe link carrying the recipient address as a query parameter
    pub fn unsubscribe_url(&self, email: &str) -> Result<String, EmailError> {
        let mut url = self.link("unsubscribe")?;
        url.query_pairs_mut().append_pair("email", email);
        Ok(url.into())
    }

    fn link(&self, path: &str) -> Result<Url, EmailError> {
        // join() replaces the last segment unless the base ends with '/'
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| EmailError::template(format!("Cannot build link '{}': {}", path, e)))
    }

    fn base_context(&self, to: &str) -> Result<Context, EmailError> {
        let mut context = Context::new();
        context.insert("site", &self.site);
        // links are serialized by `Url`, already percent-encoded
        context.insert("home_url", self.base_url.as_str());
        context.insert("recipient", to);
        context.insert("unsubscribe_url", &self.unsubscribe_url(to)?);
        context.insert("year", &chrono::Utc::now().year());
        Ok(context)
    }

    fn compose(
        &self,
        to: &str,
        subject: String,
        template: &str,
        context: &Context,
    ) -> Result<Email, EmailError> {
        let html = self.tera.render(&format!("{}.html", template), context)?;
        let text = self.tera.render(&format!("{}.txt", template), context)?;
        Ok(Email::new()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .html_body(html)
            .text_body(text))
    }
}
