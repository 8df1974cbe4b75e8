use crate::domain::position::LegPositions;
use crate::domain::trade::Fill;

/// Holding in one leg of the pair (signed units, marked to the last price)
#[derive(Debug, Clone, Default)]
pub struct Holding {
    pub symbol: String,
    pub units: f64,
    pub current_price: f64,
}

impl Holding {
    pub fn new(symbol: String) -> Self {
        Holding {
            symbol,
            units: 0.0,
            current_price: 0.0,
        }
    }

    pub fn update_price(&mut self, price: f64) {
        self.current_price = price;
    }

    /// Signed market value; negative for a short
    pub fn market_value(&self) -> f64 {
        self.units * self.current_price
    }
}

/// Cash plus the two legs of the pair
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub leg_a: Holding,
    pub leg_b: Holding,
}

impl Portfolio {
    pub fn new(symbol_a: String, symbol_b: String, cash: f64) -> Self {
        Portfolio {
            cash,
            leg_a: Holding::new(symbol_a),
            leg_b: Holding::new(symbol_b),
        }
    }

    pub fn mark(&mut self, price_a: f64, price_b: f64) {
        self.leg_a.update_price(price_a);
        self.leg_b.update_price(price_b);
    }

    pub fn apply_fill(&mut self, fill: &Fill) {
        self.leg_a.units += fill.units_a;
        self.leg_b.units += fill.units_b;
        self.cash += fill.cash_flow();
    }

    /// Cash plus mark-to-market value of both legs
    pub fn equity(&self) -> f64 {
        self.cash + self.leg_a.market_value() + self.leg_b.market_value()
    }

    pub fn legs(&self) -> LegPositions {
        LegPositions::new(self.leg_a.units, self.leg_b.units)
    }
}
