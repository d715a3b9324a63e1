//! Typed records projected from Vinted API JSON.
//!
//! Projection never fails: a missing, null, or mistyped field leaves the
//! record field at `None` (or an empty list). Numbers that arrive as strings
//! are parsed, since the API is not consistent about it.

use serde::Serialize;
use serde_json::{Map, Value};

/// Field accessor over an optional JSON object.
#[derive(Clone, Copy)]
struct Fields<'a>(Option<&'a Map<String, Value>>);

impl<'a> Fields<'a> {
    fn of(json: Option<&'a Value>) -> Self {
        Self(json.and_then(Value::as_object))
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0?.get(key).filter(|v| !v.is_null())
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn float(&self, key: &str) -> Option<f64> {
        number(self.get(key)?)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// A nested object, skipped when empty.
    fn object(&self, key: &str) -> Option<&'a Value> {
        self.get(key).filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
    }

    /// A nested array, skipped when empty.
    fn array(&self, key: &str) -> Option<&'a Vec<Value>> {
        self.get(key)?.as_array().filter(|a| !a.is_empty())
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The JSON object a record was projected from.
///
/// Ignored by equality and never serialized, so two records that project to
/// the same fields compare equal whatever else their source carried.
#[derive(Clone, Default)]
struct RawJson(Value);

impl RawJson {
    fn of(json: Option<&Value>) -> Self {
        Self(json.filter(|v| v.is_object()).cloned().unwrap_or(Value::Null))
    }
}

impl PartialEq for RawJson {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl std::fmt::Debug for RawJson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.0.as_object().map_or(0, |o| o.len());
        write!(f, "RawJson({} keys)", keys)
    }
}

/// Normalizes a money field given either as `{"amount", "currency_code"}`
/// or as a bare number / numeric string.
pub fn parse_money(value: Option<&Value>) -> (Option<f64>, Option<String>) {
    match value {
        Some(Value::Object(obj)) => (
            obj.get("amount").and_then(number),
            obj.get("currency_code").and_then(Value::as_str).map(str::to_string),
        ),
        Some(other) => (number(other), None),
        None => (None, None),
    }
}

/// A marketplace listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub catalog_id: Option<i64>,
    pub status: Option<String>,
    pub size_title: Option<String>,
    pub color1: Option<String>,
    pub url: Option<String>,
    pub path: Option<String>,
    /// Listing price
    pub price: Option<f64>,
    /// Currency code (EUR, GBP, etc.)
    pub currency: Option<String>,
    pub service_fee: Option<f64>,
    pub total_item_price: Option<f64>,
    pub favourite_count: Option<i64>,
    pub view_count: Option<i64>,
    pub is_favourite: Option<bool>,
    pub is_reserved: Option<bool>,
    pub is_closed: Option<bool>,
    pub is_hidden: Option<bool>,
    pub promoted: Option<bool>,
    pub can_buy: Option<bool>,
    pub instant_buy: Option<bool>,
    pub photos: Vec<Image>,
    /// Seller
    pub user: Option<User>,
    pub brand: Option<Brand>,
    #[serde(skip)]
    raw: RawJson,
}

impl Item {
    /// Projects an item object. `None` yields an empty record.
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        let (price, price_currency) = parse_money(f.get("price"));
        let (service_fee, _) = parse_money(f.get("service_fee"));
        let (total_item_price, _) = parse_money(f.get("total_item_price"));

        let photos = match (f.array("photos"), f.object("photo")) {
            (Some(photos), _) => photos.iter().map(|p| Image::from_json(Some(p))).collect(),
            (None, Some(photo)) => vec![Image::from_json(Some(photo))],
            (None, None) => Vec::new(),
        };

        let brand = match f.object("brand_dto") {
            Some(dto) => Some(Brand::from_json(Some(dto))),
            None => f.string("brand_title").filter(|t| !t.is_empty()).map(Brand::from_title),
        };

        Self {
            id: f.int("id"),
            title: f.string("title"),
            description: f.string("description"),
            catalog_id: f.int("catalog_id"),
            status: f.string("status"),
            size_title: f.string("size_title"),
            color1: f.string("color1"),
            url: f.string("url"),
            path: f.string("path"),
            price,
            currency: price_currency.or_else(|| f.string("currency")),
            service_fee,
            total_item_price,
            favourite_count: f.int("favourite_count"),
            view_count: f.int("view_count"),
            is_favourite: f.bool("is_favourite"),
            is_reserved: f.bool("is_reserved"),
            is_closed: f.bool("is_closed"),
            is_hidden: f.bool("is_hidden"),
            promoted: f.bool("promoted"),
            can_buy: f.bool("can_buy"),
            instant_buy: f.bool("instant_buy"),
            photos,
            user: f.object("user").map(|u| User::from_json(Some(u))),
            brand,
            raw: RawJson::of(json),
        }
    }

    /// Any field of the source object, including ones without a typed counterpart.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.0.get(key)
    }

    /// The source object (`Null` for records not built from JSON).
    pub fn raw(&self) -> &Value {
        &self.raw.0
    }

    /// Returns the main photo, falling back to the first one.
    pub fn main_photo(&self) -> Option<&Image> {
        self.photos.iter().find(|p| p.is_main == Some(true)).or_else(|| self.photos.first())
    }

    /// Returns the seller's login if the user was included.
    pub fn seller_login(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.login.as_deref())
    }
}

impl From<&Value> for Item {
    fn from(json: &Value) -> Self {
        Self::from_json(Some(json))
    }
}

/// A seller profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub id: Option<i64>,
    pub login: Option<String>,
    pub business: Option<bool>,
    pub profile_url: Option<String>,
    pub photo: Option<Image>,
    pub item_count: Option<i64>,
    pub feedback_count: Option<i64>,
    pub feedback_reputation: Option<f64>,
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
    pub country_title_local: Option<String>,
    pub city: Option<String>,
    pub locale: Option<String>,
    pub last_logged_on_ts: Option<String>,
    pub is_on_holiday: Option<bool>,
    pub is_favourite: Option<bool>,
    pub bundle_discount: Option<BundleDiscount>,
    #[serde(skip)]
    raw: RawJson,
}

impl User {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self {
            id: f.int("id"),
            login: f.string("login"),
            business: f.bool("business"),
            profile_url: f.string("profile_url"),
            photo: f.object("photo").map(|p| Image::from_json(Some(p))),
            item_count: f.int("item_count"),
            feedback_count: f.int("feedback_count"),
            feedback_reputation: f.float("feedback_reputation"),
            followers_count: f.int("followers_count"),
            following_count: f.int("following_count"),
            country_title_local: f.string("country_title_local"),
            city: f.string("city"),
            locale: f.string("locale"),
            // The API has shipped this key with a typo.
            last_logged_on_ts: f
                .string("last_logged_on_ts")
                .or_else(|| f.string("last_loged_on_ts")),
            is_on_holiday: f.bool("is_on_holiday"),
            is_favourite: f.bool("is_favourite"),
            bundle_discount: f.object("bundle_discount").map(|b| BundleDiscount::from_json(Some(b))),
            raw: RawJson::of(json),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.0.get(key)
    }

    pub fn raw(&self) -> &Value {
        &self.raw.0
    }
}

/// A brand, either from a full `brand_dto` object or a bare title.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Brand {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub path: Option<String>,
    pub is_favourite: Option<bool>,
    #[serde(skip)]
    raw: RawJson,
}

impl Brand {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self {
            id: f.int("id"),
            title: f.string("title"),
            slug: f.string("slug"),
            path: f.string("path"),
            is_favourite: f.bool("is_favourite"),
            raw: RawJson::of(json),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.0.get(key)
    }

    /// A brand known only by its title.
    pub fn from_title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }
}

/// A photo with its thumbnails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Image {
    pub id: Option<i64>,
    pub image_no: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub url: Option<String>,
    pub full_size_url: Option<String>,
    pub dominant_color: Option<String>,
    pub dominant_color_opaque: Option<String>,
    pub temp_uuid: Option<String>,
    pub orientation: Option<String>,
    pub is_main: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_suspicious: Option<bool>,
    pub thumbnails: Vec<Media>,
    pub high_resolution: Option<HighResolution>,
    #[serde(skip)]
    raw: RawJson,
}

impl Image {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self {
            id: f.int("id"),
            image_no: f.int("image_no"),
            width: f.int("width"),
            height: f.int("height"),
            url: f.string("url"),
            full_size_url: f.string("full_size_url"),
            dominant_color: f.string("dominant_color"),
            dominant_color_opaque: f.string("dominant_color_opaque"),
            temp_uuid: f.string("temp_uuid"),
            orientation: f.string("orientation"),
            is_main: f.bool("is_main"),
            is_hidden: f.bool("is_hidden"),
            is_suspicious: f.bool("is_suspicious"),
            thumbnails: f
                .array("thumbnails")
                .map(|t| t.iter().map(|m| Media::from_json(Some(m))).collect())
                .unwrap_or_default(),
            high_resolution: f.object("high_resolution").map(|h| HighResolution::from_json(Some(h))),
            raw: RawJson::of(json),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.0.get(key)
    }

    /// Returns the thumbnail of the given type (e.g. `thumb310x430`).
    pub fn thumbnail(&self, kind: &str) -> Option<&Media> {
        self.thumbnails.iter().find(|m| m.kind.as_deref() == Some(kind))
    }
}

/// One thumbnail variant of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Media {
    /// Variant name, sent by the API as `type`
    pub kind: Option<String>,
    pub url: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub original_size: Option<String>,
}

impl Media {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self {
            kind: f.string("type"),
            url: f.string("url"),
            width: f.int("width"),
            height: f.int("height"),
            original_size: f.string("original_size"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HighResolution {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub orientation: Option<String>,
}

impl HighResolution {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self { id: f.string("id"), timestamp: f.int("timestamp"), orientation: f.string("orientation") }
    }
}

/// A seller's multi-item discount settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BundleDiscount {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub enabled: Option<bool>,
    pub minimal_item_count: Option<i64>,
    pub fraction: Option<f64>,
    pub discounts: Vec<Discount>,
}

impl BundleDiscount {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self {
            id: f.string("id"),
            user_id: f.string("user_id"),
            enabled: f.bool("enabled"),
            minimal_item_count: f.int("minimal_item_count"),
            fraction: f.float("fraction"),
            discounts: f
                .array("discounts")
                .map(|d| d.iter().map(|v| Discount::from_json(Some(v))).collect())
                .unwrap_or_default(),
        }
    }
}

/// One discount tier. Missing values count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Discount {
    pub minimal_item_count: i64,
    pub fraction: f64,
}

impl Discount {
    pub fn from_json(json: Option<&Value>) -> Self {
        let f = Fields::of(json);

        Self {
            minimal_item_count: f.int("minimal_item_count").unwrap_or(0),
            fraction: f.float("fraction").unwrap_or(0.0),
        }
    }

    /// Discount as a whole percentage.
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }
}
