use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 120, g: 200, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 190, b: 90 };
pub const SEPARATOR: Color = Color::TrueColor { r: 110, g: 110, b: 110 };
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 220, g: 220, b: 220 };

pub const IPV4_ADDR: Color = Color::TrueColor { r: 130, g: 230, b: 150 };
pub const IPV6_ADDR: Color = Color::TrueColor { r: 190, g: 150, b: 255 };
pub const HOSTNAME: Color = Color::TrueColor { r: 120, g: 200, b: 255 };

pub const OPEN: Color = Color::TrueColor { r: 90, g: 220, b: 120 };
pub const CLOSED: Color = Color::TrueColor { r: 230, g: 90, b: 90 };
pub const FILTERED: Color = Color::TrueColor { r: 240, g: 200, b: 80 };
pub const NO_RESPONSE: Color = Color::TrueColor { r: 140, g: 140, b: 140 };
