//! Built-in sample documents for demo runs without an input file.

/// An invoice whose fields all appear in the default reference data.
pub const SAMPLE_INVOICE: &str = "\
FAKTURA

Dodavatel:
Dodavatel s.r.o., Hlavní 123, Praha 1

Odběratel:
Odběratel a.s., Krátká 10, Praha 2

Číslo objednávky: OBJ-2024-001
Číslo účtu: 123456789/0100
Datum splatnosti: 2030-06-30

Položky:
- Služby IT: 10000 Kč
- Konzultace: 5000 Kč

Celkem: 15000 Kč
";

/// A receipt carrying a postal code from the default reference data.
pub const SAMPLE_RECEIPT: &str = "\
ÚČTENKA

Prodejna: Knihkupectví U Mostu
Adresa: Náměstí Svobody 8, 60200 Brno

Položky:
- Kniha: 349 Kč
- Záložka: 29 Kč

Celkem: 378 Kč
Děkujeme za nákup!
";
