//! First-level administrative divisions for the two state-keyed countries.

/// US states, federal district, and territories: `(abbrev, long name)`.
pub const US_STATES: [(&str, &str); 56] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("PR", "Puerto Rico"),
    ("VI", "Virgin Islands"),
    ("GU", "Guam"),
    ("AS", "American Samoa"),
    ("MP", "Northern Mariana Islands"),
];

/// Canadian provinces and territories: `(abbrev, long name)`.
pub const CANADIAN_PROVINCES: [(&str, &str); 13] = [
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

/// Traditional short forms still seen in older data: `(alt form, abbrev)`.
pub const STATE_ALT_FORMS: [(&str, &str); 18] = [
    ("Alta.", "AB"),
    ("B.C.", "BC"),
    ("Man.", "MB"),
    ("Nfld.", "NL"),
    ("Newfoundland", "NL"),
    ("N.W.T.", "NT"),
    ("Ont.", "ON"),
    ("P.E.I.", "PE"),
    ("Que.", "QC"),
    ("Sask.", "SK"),
    ("Calif.", "CA"),
    ("Conn.", "CT"),
    ("Fla.", "FL"),
    ("Mass.", "MA"),
    ("N.H.", "NH"),
    ("N.Y.", "NY"),
    ("Penn.", "PA"),
    ("Tex.", "TX"),
];

/// Alaska divisions reported as census areas rather than boroughs.
pub const ALASKA_CENSUS_AREAS: [&str; 9] = [
    "Aleutians West",
    "Bethel",
    "Dillingham",
    "Nome",
    "Prince of Wales-Outer Ketchikan",
    "Skagway-Hoonah-Angoon",
    "Southeast Fairbanks",
    "Valdez-Cordova",
    "Yukon-Koyukuk",
];
