/// schedule - price and sac tables plus outstanding balance after payments
use chrono::NaiveDate;
use shiftbox_loan_sim::{
    remaining_balance, AmortizationSchedule, AmortizationSystem, Money, ProductConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ProductConfig::shiftbox();
    let principal = Money::from_major(6_000);
    let first_due = NaiveDate::from_ymd_opt(2024, 2, 10).ok_or("bad date")?;

    for system in [AmortizationSystem::Price, AmortizationSystem::Sac] {
        let schedule = AmortizationSchedule::generate(principal, &config.rates, 6, system, first_due)?;

        println!("=== {:?} ===", system);
        println!(" #  due         payment     interest    principal   balance");
        for row in &schedule.installments {
            println!(
                "{:>2}  {}  {:>10}  {:>10}  {:>10}  {:>10}",
                row.number,
                row.due_date,
                row.payment.round_cents(),
                row.interest.round_cents(),
                row.principal.round_cents(),
                row.ending_balance.round_cents()
            );
        }
        println!(
            "total interest {} / total paid {}\n",
            schedule.total_interest.round_cents(),
            schedule.total_paid.round_cents()
        );
    }

    let owed = remaining_balance(principal, config.rates.annual_interest_rate, 6, 2);
    println!("still owed after 2 of 6 installments: {}", owed.format_currency(&config.currency_symbol));

    Ok(())
}
