#![allow(dead_code)]

/// One ad container in the marketplace layout.
#[derive(Debug, Clone)]
pub struct AdFixture {
    pub id: String,
    pub title: Option<String>,
    pub price: String,
    pub location: String,
    pub posted: String,
    pub counters: (u64, u64),
}

impl AdFixture {
    pub fn new(id: &str, title: &str, posted: &str) -> Self {
        Self {
            id: id.to_string(),
            title: Some(title.to_string()),
            price: "1.000 din".to_string(),
            location: "Beograd".to_string(),
            posted: posted.to_string(),
            counters: (10, 2),
        }
    }

    pub fn price(mut self, price: &str) -> Self {
        self.price = price.to_string();
        self
    }

    pub fn location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn html(&self) -> String {
        let title = self
            .title
            .as_ref()
            .map(|t| format!(r#"<div class="AdItem_name__Kn2tO">{t}</div>"#))
            .unwrap_or_default();
        format!(
            r#"<section id="{id}" class="AdItem_adOuterHolder__hb5N_" data-category-id="1221">
  <div class="AdItem_adHolder__NoNLJ">
    <div class="AdItem_imageHolder__LFmGy"><img src="/images/{id}.jpg" alt="{id}"></div>
    <div class="AdItem_adInfoHolder__ZDdsC">
      <a href="/video-igre/oglas/{id}">{title}</a>
      <p>Opis oglasa {id}</p>
    </div>
    <div class="AdItem_price__jUgxi">{price}</div>
    <div class="AdItem_originAndPromoLocation__tZ9xl"><p>{location}</p></div>
    <div class="AdItem_postedStatus__4fc5d">{posted}</div>
    <div class="AdItem_stats__Yc3nR">
      <span class="AdItem_count__iCAoM">{views}</span>
      <span class="AdItem_count__iCAoM">{favorites}</span>
    </div>
  </div>
</section>"#,
            id = self.id,
            title = title,
            price = self.price,
            location = self.location,
            posted = self.posted,
            views = self.counters.0,
            favorites = self.counters.1,
        )
    }
}

/// A search-result page with the given ads and a pagination widget up to `last_page`.
pub fn results_page(ads: &[AdFixture], last_page: u32) -> String {
    let links: String = (1..=last_page)
        .map(|page| format!(r#"<a href="/pretraga?keywords=ps5&page={page}">{page}</a>"#))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="sr"><head><title>Pretraga</title></head>
<body>
<main>
{ads}
</main>
<nav class="Pagination_pagination__Fx1pt">{links}</nav>
<footer>© 2008-2024 KupujemProdajem, 1.000.000 korisnika</footer>
</body></html>"#,
        ads = ads.iter().map(AdFixture::html).collect::<Vec<_>>().join("\n"),
        links = links,
    )
}
