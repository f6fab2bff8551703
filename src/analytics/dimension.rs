//! Grouping dimensions over the drug catalog.
//!
//! Every supported dimension is a variant of [`Dimension`]; each variant owns
//! the function that derives its grouping key from a [`Drug`]. Missing values
//! are carried as [`FieldValue::Absent`] until [`FieldValue::into_key`] turns
//! them into [`UNKNOWN`].

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::models::Drug;

/// Group name used for records whose dimension field is missing or blank.
pub const UNKNOWN: &str = "Unknown";

/// A record field as seen by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Present(&'a str),
    Absent,
}

impl<'a> FieldValue<'a> {
    /// Blank and whitespace-only strings count as absent.
    pub fn from_option(value: Option<&'a str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => FieldValue::Present(v),
            _ => FieldValue::Absent,
        }
    }

    /// First `chars` characters of a present value.
    pub fn prefix(self, chars: usize) -> Self {
        match self {
            FieldValue::Present(v) => {
                let end = v.char_indices().nth(chars).map_or(v.len(), |(i, _)| i);
                FieldValue::Present(&v[..end])
            }
            FieldValue::Absent => FieldValue::Absent,
        }
    }

    /// `self` if present, otherwise `fallback`.
    pub fn or(self, fallback: FieldValue<'a>) -> Self {
        match self {
            FieldValue::Present(_) => self,
            FieldValue::Absent => fallback,
        }
    }

    pub fn into_key(self) -> String {
        match self {
            FieldValue::Present(v) => v.to_string(),
            FieldValue::Absent => UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Dimension {
    /// Drug name
    Drug,
    /// Russian trade name, falling back to the drug name
    TradeName,
    Manufacturer,
    Country,
    /// First ATX level (anatomical main group, one letter)
    AtxCode,
    /// Second ATX level (three characters, e.g. `N02`)
    AtxLevel2,
    Form,
    TherapeuticGroup,
    /// `Rx` or `OTC`
    Prescription,
    Inn,
}

impl Dimension {
    pub const ALL: [Dimension; 10] = [
        Dimension::Drug,
        Dimension::TradeName,
        Dimension::Manufacturer,
        Dimension::Country,
        Dimension::AtxCode,
        Dimension::AtxLevel2,
        Dimension::Form,
        Dimension::TherapeuticGroup,
        Dimension::Prescription,
        Dimension::Inn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Drug => "drug",
            Dimension::TradeName => "tradeName",
            Dimension::Manufacturer => "manufacturer",
            Dimension::Country => "country",
            Dimension::AtxCode => "atxCode",
            Dimension::AtxLevel2 => "atxLevel2",
            Dimension::Form => "form",
            Dimension::TherapeuticGroup => "therapeuticGroup",
            Dimension::Prescription => "prescription",
            Dimension::Inn => "inn",
        }
    }

    /// Parse a query-string dimension name. `atxGroup` is accepted as an
    /// alias of `atxCode`.
    pub fn parse(name: &str) -> Option<Dimension> {
        let name = name.trim();
        if name == "atxGroup" {
            return Some(Dimension::AtxCode);
        }
        Dimension::ALL.into_iter().find(|d| d.as_str() == name)
    }

    /// Parse `name`, using `default` when it is missing or unrecognized.
    pub fn parse_or(name: Option<&str>, default: Dimension) -> Dimension {
        name.and_then(Dimension::parse).unwrap_or(default)
    }

    pub fn value<'a>(&self, drug: &'a Drug) -> FieldValue<'a> {
        let field = |v: &'a Option<String>| FieldValue::from_option(v.as_deref());

        match self {
            Dimension::Drug => FieldValue::from_option(Some(drug.name.as_str())),
            Dimension::TradeName => {
                field(&drug.name_ru).or(FieldValue::from_option(Some(drug.name.as_str())))
            }
            Dimension::Manufacturer => field(&drug.manufacturer),
            Dimension::Country => field(&drug.country),
            Dimension::AtxCode => field(&drug.atx_code).prefix(1),
            Dimension::AtxLevel2 => field(&drug.atx_code).prefix(3),
            Dimension::Form => field(&drug.form),
            Dimension::TherapeuticGroup => field(&drug.therapeutic_group),
            Dimension::Prescription => {
                FieldValue::Present(if drug.prescription { "Rx" } else { "OTC" })
            }
            Dimension::Inn => field(&drug.inn),
        }
    }

    /// Grouping key of `drug` along this dimension. Never empty.
    pub fn key(&self, drug: &Drug) -> String {
        self.value(drug).into_key()
    }
}

impl From<Dimension> for &'static str {
    fn from(dimension: Dimension) -> Self {
        dimension.as_str()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::parse(s).ok_or_else(|| format!("unknown dimension '{s}'"))
    }
}

#[cfg(test)]
pub(crate) fn drug(name: &str) -> Drug {
    Drug {
        id: 0,
        name: name.to_string(),
        name_ru: None,
        name_uz: None,
        inn: None,
        atx_code: None,
        therapeutic_group: None,
        form: None,
        dosage: None,
        manufacturer: None,
        country: None,
        prescription: false,
        barcode: None,
        created_at: 0,
        updated_at: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dimension_round_trips_its_name() {
        for dimension in Dimension::ALL {
            assert_eq!(Dimension::parse(dimension.as_str()), Some(dimension));
        }
        assert_eq!(Dimension::parse("atxGroup"), Some(Dimension::AtxCode));
        assert_eq!(Dimension::parse("color"), None);
    }

    #[test]
    fn test_unknown_name_falls_back_to_default() {
        assert_eq!(
            Dimension::parse_or(Some("bogus"), Dimension::Manufacturer),
            Dimension::Manufacturer
        );
        assert_eq!(Dimension::parse_or(None, Dimension::Drug), Dimension::Drug);
        assert_eq!(
            Dimension::parse_or(Some("country"), Dimension::Drug),
            Dimension::Country
        );
    }

    #[test]
    fn test_absent_and_blank_fields_are_unknown() {
        let mut d = drug("Aspirin");
        assert_eq!(Dimension::Country.key(&d), UNKNOWN);

        d.country = Some("   ".to_string());
        assert_eq!(Dimension::Country.key(&d), UNKNOWN);

        d.country = Some(" Germany ".to_string());
        assert_eq!(Dimension::Country.key(&d), "Germany");
    }

    #[test]
    fn test_atx_prefixes() {
        let mut d = drug("Ibuprofen");
        assert_eq!(Dimension::AtxCode.key(&d), UNKNOWN);
        assert_eq!(Dimension::AtxLevel2.key(&d), UNKNOWN);

        d.atx_code = Some("M01AE01".to_string());
        assert_eq!(Dimension::AtxCode.key(&d), "M");
        assert_eq!(Dimension::AtxLevel2.key(&d), "M01");

        d.atx_code = Some("M".to_string());
        assert_eq!(Dimension::AtxLevel2.key(&d), "M");
    }

    #[test]
    fn test_trade_name_falls_back_to_name() {
        let mut d = drug("Paracetamol");
        assert_eq!(Dimension::TradeName.key(&d), "Paracetamol");

        d.name_ru = Some("Парацетамол".to_string());
        assert_eq!(Dimension::TradeName.key(&d), "Парацетамол");
    }

    #[test]
    fn test_prescription_is_never_unknown() {
        let mut d = drug("Amoxicillin");
        assert_eq!(Dimension::Prescription.key(&d), "OTC");
        d.prescription = true;
        assert_eq!(Dimension::Prescription.key(&d), "Rx");
    }

    #[test]
    fn test_serializes_as_query_name() {
        let json = serde_json::to_string(&Dimension::TherapeuticGroup).unwrap();
        assert_eq!(json, "\"therapeuticGroup\"");
    }
}
