//! Domain models for the booking engine

pub mod balance;
pub mod booking;
pub mod coupon;
pub mod ticket;
pub mod trip;
pub mod user;

pub use balance::{BalanceTransaction, DepositReceipt, PaymentMethod, TransactionType};
pub use booking::{
    BookedSeat, BookingResult, CancellationResult, CouponPreview, Discount, Itinerary, Leg,
    Requester, SeatMap, TripDeletion,
};
pub use coupon::{normalize_code, Coupon, CouponRedemption, NewCoupon, MAX_COUPON_CODE_LEN};
pub use ticket::{
    DisplayStatus, RiderTicket, Ticket, TicketStatus, TicketSummary, TicketWithTrip,
};
pub use trip::{BusType, NewTrip, Trip};
pub use user::{Company, User, UserRole};
