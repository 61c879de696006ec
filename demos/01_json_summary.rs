/// json summary - serializable view of a group's ledger state
use savings_ledger_rs::{
    FineTier, GroupConfig, GroupLedger, GroupSummaryView, LateFineRule, Member, Money, Payment,
    Rate,
};
use savings_ledger_rs::chrono::NaiveDate;
use savings_ledger_rs::Decimal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // tiered late fines: Rs 10/day for the first week, Rs 20/day after
    let rule = LateFineRule::tiered(vec![
        FineTier {
            start_day: 1,
            end_day: 7,
            amount: Decimal::from(10),
            is_percentage: false,
        },
        FineTier {
            start_day: 8,
            end_day: 15,
            amount: Decimal::from(20),
            is_percentage: false,
        },
    ]);

    let config = GroupConfig::monthly(
        "bachat gat",
        Money::from_major(500),
        Rate::from_percentage(12),
        15,
    )
    .with_late_fine_rule(rule)
    .with_opening_balances(Money::from_major(1_000), Money::from_major(5_000));

    let mut ledger = GroupLedger::new(
        config,
        vec![Member::new("asha")],
        NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("bad date")?,
    )?;

    // a late partial payment
    let period_id = ledger.current_period()?.id;
    let row_id = ledger.contributions_for(period_id)[0].id;
    ledger.record_payment(
        row_id,
        &[Payment::Compulsory(Money::from_major(300))],
        NaiveDate::from_ymd_opt(2024, 3, 25).ok_or("bad date")?,
    )?;

    let view = GroupSummaryView::from_ledger(&ledger);
    println!("{}", view.to_json_pretty()?);

    Ok(())
}
