mod concurrency;
mod events;
mod scenarios;
