use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: Accounts and social graph

CREATE TABLE users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    full_name TEXT NOT NULL,
    bio TEXT NOT NULL DEFAULT '',
    profile_picture TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE friend_requests (
    from_user TEXT NOT NULL,
    to_user TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (from_user, to_user),
    FOREIGN KEY (from_user) REFERENCES users(id),
    FOREIGN KEY (to_user) REFERENCES users(id)
);

CREATE INDEX idx_friend_requests_to ON friend_requests(to_user);

-- Friendship pairs are normalized: user_a is always the lexicographically
-- smaller id, so a pair can exist only once.
CREATE TABLE friendships (
    user_a TEXT NOT NULL,
    user_b TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_a, user_b),
    FOREIGN KEY (user_a) REFERENCES users(id),
    FOREIGN KEY (user_b) REFERENCES users(id)
);

CREATE INDEX idx_friendships_b ON friendships(user_b);

CREATE TABLE follows (
    follower TEXT NOT NULL,
    followed TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (follower, followed),
    FOREIGN KEY (follower) REFERENCES users(id),
    FOREIGN KEY (followed) REFERENCES users(id)
);

CREATE INDEX idx_follows_followed ON follows(followed);
",
        ),
        M::up(
            "-- Migration 2: Recipes and engagement

CREATE TABLE recipes (
    id TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    ingredients TEXT NOT NULL DEFAULT '[]',
    instructions TEXT NOT NULL DEFAULT '[]',
    images TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    cooking_time_minutes INTEGER NOT NULL,
    difficulty TEXT NOT NULL,
    category TEXT NOT NULL,
    is_public INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (author) REFERENCES users(id)
);

CREATE INDEX idx_recipes_author ON recipes(author);
CREATE INDEX idx_recipes_category ON recipes(category);
CREATE INDEX idx_recipes_created ON recipes(created_at DESC);

CREATE TABLE recipe_likes (
    recipe_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (recipe_id, user_id),
    FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX idx_recipe_likes_user ON recipe_likes(user_id);

CREATE TABLE recipe_comments (
    id TEXT PRIMARY KEY,
    recipe_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX idx_recipe_comments_recipe ON recipe_comments(recipe_id);

CREATE TABLE recipe_saves (
    recipe_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (recipe_id, user_id),
    FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX idx_recipe_saves_user ON recipe_saves(user_id);
",
        ),
        M::up(
            "-- Migration 3: Ephemeral stories

CREATE TABLE stories (
    id TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    image TEXT,
    background_color TEXT NOT NULL DEFAULT '#000000',
    text_color TEXT NOT NULL DEFAULT '#ffffff',
    font TEXT NOT NULL DEFAULT 'Arial',
    font_size INTEGER NOT NULL DEFAULT 24,
    text_align TEXT NOT NULL DEFAULT 'center',
    is_active INTEGER NOT NULL DEFAULT 1,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (author) REFERENCES users(id)
);

CREATE INDEX idx_stories_author ON stories(author);
CREATE INDEX idx_stories_expires ON stories(expires_at);

CREATE TABLE story_views (
    story_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    viewed_at TEXT NOT NULL,
    PRIMARY KEY (story_id, user_id),
    FOREIGN KEY (story_id) REFERENCES stories(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
",
        ),
        M::up(
            "-- Migration 4: Cooking challenges

CREATE TABLE challenges (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    emoji TEXT NOT NULL DEFAULT '🏆',
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    prize TEXT NOT NULL DEFAULT 'Recognition and Badge',
    rules TEXT NOT NULL DEFAULT '[]',
    hashtags TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE challenge_participants (
    challenge_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    joined_at TEXT NOT NULL,
    PRIMARY KEY (challenge_id, user_id),
    FOREIGN KEY (challenge_id) REFERENCES challenges(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
",
        ),
        M::up(
            "-- Migration 5: Durable chat history

-- Conversation pairs are normalized like friendships: participant_a is the
-- lexicographically smaller id.
CREATE TABLE conversations (
    id TEXT PRIMARY KEY,
    participant_a TEXT NOT NULL,
    participant_b TEXT NOT NULL,
    last_message_id TEXT,
    last_activity TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (participant_a, participant_b),
    FOREIGN KEY (participant_a) REFERENCES users(id),
    FOREIGN KEY (participant_b) REFERENCES users(id)
);

CREATE INDEX idx_conversations_a ON conversations(participant_a);
CREATE INDEX idx_conversations_b ON conversations(participant_b);

CREATE TABLE messages (
    id TEXT PRIMARY KEY,
    sender TEXT NOT NULL,
    recipient TEXT NOT NULL,
    body TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'text',
    is_read INTEGER NOT NULL DEFAULT 0,
    read_at TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (sender) REFERENCES users(id),
    FOREIGN KEY (recipient) REFERENCES users(id)
);

CREATE INDEX idx_messages_pair ON messages(sender, recipient, created_at);
CREATE INDEX idx_messages_unread ON messages(recipient, is_read);
",
        ),
    ])
}
