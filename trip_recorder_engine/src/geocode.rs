use crate::ports::Geocoder;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Reverse geocoder backed by the OpenStreetMap Nominatim API. Any transport
/// or decode failure degrades to an empty label so the session flow proceeds.
#[derive(Clone)]
pub struct ReverseGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl ReverseGeocoder {
    pub fn new() -> Self {
        Self::with_base_url(NOMINATIM_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, lat: f64, lng: f64) -> Result<String, reqwest::Error> {
        let body: serde_json::Value = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("zoom", "14".to_string()),
            ])
            .header(reqwest::header::USER_AGENT, "trip_recorder/0.1")
            .send()
            .await?
            .json()
            .await?;

        Ok(place_label(&body))
    }
}

impl Default for ReverseGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

fn place_label(body: &serde_json::Value) -> String {
    body.get("name")
        .and_then(|name| name.as_str())
        .filter(|name| !name.is_empty())
        .or_else(|| body.get("display_name").and_then(|name| name.as_str()))
        .unwrap_or_default()
        .to_string()
}

impl Geocoder for ReverseGeocoder {
    async fn resolve(&self, lat: f64, lng: f64) -> String {
        match self.lookup(lat, lng).await {
            Ok(label) => label,
            Err(err) => {
                tracing::warn!("Reverse geocoding failed: {err}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_name_over_display_name() {
        let body = json!({"name": "Nyhavn", "display_name": "Nyhavn, Copenhagen, Denmark"});
        assert_eq!(place_label(&body), "Nyhavn");
    }

    #[test]
    fn empty_name_falls_through_to_display_name() {
        let body = json!({"name": "", "display_name": "Copenhagen, Denmark"});
        assert_eq!(place_label(&body), "Copenhagen, Denmark");
    }

    #[test]
    fn unknown_place_is_an_empty_label() {
        assert_eq!(place_label(&json!({"error": "Unable to geocode"})), "");
    }
}
